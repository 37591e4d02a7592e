//! # Nuclear statistical equilibrium
//!
//! ## Purpose
//! Above a density and temperature threshold, and once the composition has been driven to the
//! iron group, the burn can be replaced by a lookup: the equilibrium composition, mean nucleon
//! number, binding energy per nucleon and electron-capture rate are tabulated as functions of
//! (log10 T, log10 rho, y_e).
//!
//! ## Main Structures
//! - `NseTable`: the table, read from a whitespace-separated text file or generated from a
//!   function, interpolated trilinearly
//! - `NseCriteria`: thresholds deciding whether a state is in NSE
//! - `NseShortcut`: what the burner needs from an NSE treatment
//! - `TableNse`: the table-based implementation, carrying `(y_e, abar, B/A)` as the first three
//!   auxiliary scalars of the burn state
//!
//! ## Table grid
//! | axis        | range       | spacing | points |
//! |-------------|-------------|---------|--------|
//! | log10 T     | 9.0 - 10.4  | 0.02    | 71     |
//! | log10 rho   | 7.0 - 10.0  | 0.10    | 31     |
//! | y_e         | 0.50 - 0.40 | 0.005   | 21     |
//!
//! Each row of a table file holds: log10 T, log10 rho, y_e, three unused group abundances,
//! abar, B/A (MeV), dy_e/dt, then the mass fractions of every species.
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::constants::ENUC_CONV;
use crate::Interfaces::errors::{BurnError, IntegrationStatus};
use crate::Interfaces::network::Network;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

pub const NTEMP: usize = 71;
pub const NDEN: usize = 31;
pub const NYE: usize = 21;
pub const NPTS: usize = NTEMP * NDEN * NYE;

const TLOG_MIN: f64 = 9.0;
const TLOG_MAX: f64 = 10.4;
const TLOG_STEP: f64 = 0.02;
const RLOG_MIN: f64 = 7.0;
const RLOG_MAX: f64 = 10.0;
const RLOG_STEP: f64 = 0.10;
const YE_MAX: f64 = 0.50;
const YE_MIN: f64 = 0.40;
const YE_STEP: f64 = 0.005;

/// auxiliary scalar slots used by the NSE treatment
pub const AUX_YE: usize = 0;
pub const AUX_ABAR: usize = 1;
pub const AUX_BEA: usize = 2;

/// one interpolated table entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NsePoint {
    pub abar: f64,
    /// binding energy per nucleon, MeV
    pub bea: f64,
    pub dyedt: f64,
}

#[derive(Debug, Clone)]
pub struct NseTable {
    nspec: usize,
    abartab: Vec<f64>,
    ebtab: Vec<f64>,
    wratetab: Vec<f64>,
    /// `massfractab[j * nspec + n]`
    massfractab: Vec<f64>,
}

fn table_index(ir: usize, it: usize, ic: usize) -> usize {
    ir * NTEMP * NYE + it * NYE + ic
}

impl NseTable {
    /// Generates a table from a function of (log10 T, log10 rho, y_e) that fills the mass
    /// fractions and returns abar, B/A and the weak rate (positive for net electron capture).
    pub fn from_fn<F>(nspec: usize, f: F) -> Self
    where
        F: Fn(f64, f64, f64, &mut [f64]) -> (f64, f64, f64),
    {
        let mut table = Self {
            nspec,
            abartab: vec![0.0; NPTS],
            ebtab: vec![0.0; NPTS],
            wratetab: vec![0.0; NPTS],
            massfractab: vec![0.0; NPTS * nspec],
        };
        for ir in 0..NDEN {
            for it in 0..NTEMP {
                for ic in 0..NYE {
                    let j = table_index(ir, it, ic);
                    let tlog = TLOG_MIN + it as f64 * TLOG_STEP;
                    let rlog = RLOG_MIN + ir as f64 * RLOG_STEP;
                    let ye = YE_MAX - ic as f64 * YE_STEP;
                    let (abar, eb, wrate) =
                        f(tlog, rlog, ye, &mut table.massfractab[j * nspec..(j + 1) * nspec]);
                    table.abartab[j] = abar;
                    table.ebtab[j] = eb;
                    table.wratetab[j] = wrate;
                }
            }
        }
        table
    }

    /// Reads a table in the text layout described in the module documentation.
    pub fn from_reader<R: BufRead>(reader: R, nspec: usize) -> Result<Self, BurnError> {
        let ncols = 9 + nspec;
        let mut values = Vec::with_capacity(NPTS * ncols);
        for line in reader.lines() {
            let line = line?;
            for token in line.split_whitespace() {
                let value: f64 = token
                    .parse()
                    .map_err(|_| BurnError::Table(format!("cannot parse '{}'", token)))?;
                values.push(value);
            }
        }
        if values.len() != NPTS * ncols {
            return Err(BurnError::Table(format!(
                "expected {} values for {} species, found {}",
                NPTS * ncols,
                nspec,
                values.len()
            )));
        }
        let mut table = Self {
            nspec,
            abartab: vec![0.0; NPTS],
            ebtab: vec![0.0; NPTS],
            wratetab: vec![0.0; NPTS],
            massfractab: vec![0.0; NPTS * nspec],
        };
        // rows are ordered by density, then temperature, then y_e
        for (j, row) in values.chunks(ncols).enumerate() {
            table.abartab[j] = row[6];
            table.ebtab[j] = row[7];
            table.wratetab[j] = row[8];
            table.massfractab[j * nspec..(j + 1) * nspec].copy_from_slice(&row[9..]);
        }
        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P, nspec: usize) -> Result<Arc<Self>, BurnError> {
        let file = fs::File::open(path.as_ref())?;
        let table = Self::from_reader(BufReader::new(file), nspec)?;
        info!("NSE table read from {}", path.as_ref().display());
        Ok(Arc::new(table))
    }

    /// Writes the table in the layout read by [`NseTable::from_reader`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BurnError> {
        let mut content = String::new();
        for ir in 0..NDEN {
            for it in 0..NTEMP {
                for ic in 0..NYE {
                    let j = table_index(ir, it, ic);
                    content.push_str(&format!(
                        "{:.4} {:.3} {:.4} 0.0 0.0 0.0 {:.10e} {:.10e} {:.10e}",
                        TLOG_MIN + it as f64 * TLOG_STEP,
                        RLOG_MIN + ir as f64 * RLOG_STEP,
                        YE_MAX - ic as f64 * YE_STEP,
                        self.abartab[j],
                        self.ebtab[j],
                        self.wratetab[j]
                    ));
                    for n in 0..self.nspec {
                        content.push_str(&format!(" {:.10e}", self.massfractab[j * self.nspec + n]));
                    }
                    content.push('\n');
                }
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn nspec(&self) -> usize {
        self.nspec
    }

    /// Trilinear interpolation at (T, rho, y_e), clamped to the table edges. The mass fractions
    /// are written to `xn`. The returned rate is dy_e/dt, negative for net electron capture.
    pub fn interpolate(&self, T: f64, rho: f64, ye: f64, xn: &mut [f64]) -> NsePoint {
        let tlog = T.log10().clamp(TLOG_MIN, TLOG_MAX);
        let rholog = rho.log10().clamp(RLOG_MIN, RLOG_MAX);
        let yet = ye.clamp(YE_MIN, YE_MAX);

        let it1 = (((tlog - TLOG_MIN) / TLOG_STEP - 1.0e-6).max(0.0) as usize).min(NTEMP - 2);
        let ir1 = (((rholog - RLOG_MIN) / RLOG_STEP - 1.0e-6).max(0.0) as usize).min(NDEN - 2);
        let ic1 = (((YE_MAX - yet) / YE_STEP - 1.0e-6).max(0.0) as usize).min(NYE - 2);

        let t0 = TLOG_MIN + it1 as f64 * TLOG_STEP;
        let r0 = RLOG_MIN + ir1 as f64 * RLOG_STEP;
        let x0 = YE_MAX - ic1 as f64 * YE_STEP;
        let td = (tlog - t0) / TLOG_STEP;
        let rd = (rholog - r0) / RLOG_STEP;
        let xd = ((x0 - yet) / YE_STEP).max(0.0);

        // corner indices and weights
        let mut corners = [(0usize, 0.0f64); 8];
        let mut k = 0;
        for (dt_i, wt) in [(0, 1.0 - td), (1, td)] {
            for (dr_i, wr) in [(0, 1.0 - rd), (1, rd)] {
                for (dc_i, wc) in [(0, 1.0 - xd), (1, xd)] {
                    corners[k] = (table_index(ir1 + dr_i, it1 + dt_i, ic1 + dc_i), wt * wr * wc);
                    k += 1;
                }
            }
        }

        let mut point = NsePoint {
            abar: 0.0,
            bea: 0.0,
            dyedt: 0.0,
        };
        for x in xn.iter_mut() {
            *x = 0.0;
        }
        for (j, w) in corners {
            point.abar += self.abartab[j] * w;
            point.bea += self.ebtab[j] * w;
            point.dyedt += self.wratetab[j] * w;
            for n in 0..self.nspec {
                xn[n] += self.massfractab[j * self.nspec + n] * w;
            }
        }
        // the table holds electron capture plus positron decay, y_e decreases when it is positive
        point.dyedt = -point.dyedt;
        point
    }
}

/// thresholds for switching a burn to the NSE table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NseCriteria {
    pub rho_nse: f64,
    pub T_nse: f64,
    /// largest carbon-group abundance still treated as NSE
    pub C_nse: f64,
    /// smallest helium plus iron group abundance treated as NSE
    pub He_Fe_nse: f64,
    /// under-relaxation of the binding energy change
    pub eta: f64,
    pub fe_group: Vec<usize>,
    pub c_group: Vec<usize>,
    pub he_group: Vec<usize>,
}

impl Default for NseCriteria {
    fn default() -> Self {
        Self {
            rho_nse: 3.0e7,
            T_nse: 3.0e9,
            C_nse: 1.0,
            He_Fe_nse: 0.0,
            eta: 1.0,
            fe_group: Vec::new(),
            c_group: Vec::new(),
            he_group: Vec::new(),
        }
    }
}

/// An NSE treatment the burner can hand a state to instead of integrating it.
pub trait NseShortcut {
    fn in_nse(&self, state: &BurnState) -> bool;
    /// advance `state` by `dt` using the equilibrium composition
    fn nse_burn(&self, state: &mut BurnState, dt: f64) -> Result<(), BurnError>;
    /// make the auxiliary composition data consistent with the mass fractions after a regular burn
    fn set_aux_from_X(&self, state: &mut BurnState);
}

#[derive(Debug, Clone)]
pub struct TableNse {
    table: Arc<NseTable>,
    criteria: NseCriteria,
    aion: Vec<f64>,
    zion: Vec<f64>,
    bion: Vec<f64>,
}

impl TableNse {
    pub fn new<N: Network + ?Sized>(
        table: Arc<NseTable>,
        criteria: NseCriteria,
        network: &N,
    ) -> Result<Self, BurnError> {
        if table.nspec() != network.nspec() {
            return Err(BurnError::DimensionMismatch {
                expected: network.nspec(),
                found: table.nspec(),
            });
        }
        let nspec = network.nspec();
        for group in [&criteria.fe_group, &criteria.c_group, &criteria.he_group] {
            if let Some(bad) = group.iter().find(|n| **n >= nspec) {
                return Err(BurnError::InvalidConfiguration(format!(
                    "NSE group species index {} out of range",
                    bad
                )));
            }
        }
        Ok(Self {
            table,
            criteria,
            aion: network.aion().to_vec(),
            zion: network.zion().to_vec(),
            bion: network.bion().to_vec(),
        })
    }

    fn group_sum(state: &BurnState, group: &[usize]) -> f64 {
        group.iter().map(|n| state.xn[*n]).sum()
    }

    fn check_aux(state: &BurnState) -> Result<(), BurnError> {
        if state.aux.len() < 3 {
            return Err(BurnError::DimensionMismatch {
                expected: 3,
                found: state.aux.len(),
            });
        }
        Ok(())
    }
}

impl NseShortcut for TableNse {
    fn in_nse(&self, state: &BurnState) -> bool {
        if state.aux.len() < 3 {
            return false;
        }
        if state.rho > self.criteria.rho_nse && state.T > self.criteria.T_nse {
            let fe = Self::group_sum(state, &self.criteria.fe_group);
            let c = Self::group_sum(state, &self.criteria.c_group);
            let he = Self::group_sum(state, &self.criteria.he_group);
            return fe + he > self.criteria.He_Fe_nse && c < self.criteria.C_nse;
        }
        false
    }

    fn nse_burn(&self, state: &mut BurnState, dt: f64) -> Result<(), BurnError> {
        Self::check_aux(state)?;
        let nspec = state.nspec();
        if nspec != self.table.nspec() {
            return Err(BurnError::DimensionMismatch {
                expected: self.table.nspec(),
                found: nspec,
            });
        }
        let xn = state.xn.as_mut_slice();

        // first pass gives dy_e/dt, second pass the composition at the updated y_e
        let first = self.table.interpolate(state.T, state.rho, state.aux[AUX_YE], xn);
        state.aux[AUX_YE] += dt * first.dyedt;
        let xn = state.xn.as_mut_slice();
        let second = self.table.interpolate(state.T, state.rho, state.aux[AUX_YE], xn);

        let deltaq = self.criteria.eta * (second.bea - state.aux[AUX_BEA]);
        state.aux[AUX_BEA] += deltaq;
        state.aux[AUX_ABAR] = second.abar;

        // MeV per nucleon to erg/g
        let enuc = deltaq * ENUC_CONV;
        state.e += enuc;
        state.e_nuc = enuc;
        state.time = dt;
        state.success = true;
        state.status = IntegrationStatus::Success;
        state.n_rhs = 0;
        state.n_jac = 0;
        state.n_step = 0;
        debug!(
            "NSE burn: rho = {:e}, T = {:e}, y_e = {}, energy released = {:e}",
            state.rho, state.T, state.aux[AUX_YE], enuc
        );
        Ok(())
    }

    fn set_aux_from_X(&self, state: &mut BurnState) {
        if state.aux.len() < 3 {
            return;
        }
        let mut ye = 0.0;
        let mut inv_abar = 0.0;
        let mut bea = 0.0;
        for n in 0..self.aion.len() {
            ye += state.xn[n] * self.zion[n] / self.aion[n];
            inv_abar += state.xn[n] / self.aion[n];
            bea += state.xn[n] * self.bion[n] / self.aion[n];
        }
        state.aux[AUX_YE] = ye;
        state.aux[AUX_ABAR] = 1.0 / inv_abar;
        state.aux[AUX_BEA] = bea;
    }
}
