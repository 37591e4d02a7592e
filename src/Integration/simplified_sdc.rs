//! # Simplified-SDC coupling
//!
//! ## Purpose
//! Burns the conserved variables of a hydrodynamic zone together with the advective sources
//! handed over by the hydro solver. The integrated vector is the evolved part of the conserved
//! array (see [`SdcLayout`]); density and momenta are not evolved but follow their advective
//! rates, `rho(t) = rho_orig + ydot_a[rho] t`.
//!
//! ## Main Structures
//! - `SdcSystem`: right-hand side `R(U) = ydot_a + reactions(U)` and its Jacobian for one burn.
//!
//! ## Jacobian
//! The reaction terms are naturally functions of the thermodynamic variables
//! w = (rho, X, K, T) in energy mode (K the specific kinetic energy) and w = (rho, X, T) in
//! enthalpy mode. The Jacobian is assembled as dR/dw dw/dU with one extra auxiliary density slot
//! in U. The auxiliary slot is dropped in energy mode, where the density is not evolved, and
//! folded into the partial densities in enthalpy mode, where rho = sum(rho X).
use crate::Integration::coupling::{CouplingLayer, plausible_mass_fractions};
use crate::Integration::dvode::OdeSystem;
use crate::Interfaces::burn_type::{BurnState, SdcData, SdcEvolve, SdcLayout};
use crate::Interfaces::eos_composition::{EosXDerivatives, call_eos, composition_derivatives};
use crate::Interfaces::eos_type::{Eos, EosInput, EosState};
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::{Network, jac_y_to_x, net_ienuc, net_itemp, neqs, ydot_y_to_x};
use crate::settings::{BurnerSettings, JacobianMode};
use nalgebra::{DMatrix, DVector};
use std::iter;
use std::option;
use std::ops::Range;

/// lower bound of a partial density relative to the density
const SMALL_PARTIAL_DENSITY: f64 = 1.0e-200;
/// relative density perturbation of the one-sided density derivative
const DENSITY_EPS: f64 = 1.0e-8;

const IWRHO: usize = 0;
const IWFS: usize = 1;

pub struct SdcSystem<'a, N: Network + ?Sized, E: Eos + ?Sized> {
    network: &'a N,
    eos: &'a E,
    settings: &'a BurnerSettings,
    state: &'a mut BurnState,
    /// working copy of the conserved data, written back on unpack
    sdc: SdcData,
    dt: f64,
    /// slot of rho e (energy mode) or rho h (enthalpy mode)
    sint: usize,
    seden: Option<usize>,
    /// density at construction, scales the absolute tolerances
    rho_in: f64,
    /// rho e or rho h at the start of the burn
    energy_in: f64,

    work: BurnState,
    eos_state: EosState,
    net_ydot: DVector<f64>,
    net_ydot_pert: DVector<f64>,
    net_jac: DMatrix<f64>,
    derivs: EosXDerivatives,
    dRdw: DMatrix<f64>,
    dwdU: DMatrix<f64>,
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> SdcSystem<'a, N, E> {
    pub fn new(
        network: &'a N,
        eos: &'a E,
        settings: &'a BurnerSettings,
        state: &'a mut BurnState,
        dt: f64,
    ) -> Result<Self, BurnError> {
        let sdc = state.sdc.clone().ok_or_else(|| {
            BurnError::InvalidConfiguration(
                "simplified-SDC coupling needs conserved data on the burn state".to_string(),
            )
        })?;
        let layout = sdc.layout;
        let nspec = state.nspec();
        if layout.evolve != settings.sdc_evolve {
            return Err(BurnError::InvalidConfiguration(format!(
                "conserved data evolves {:?} but the settings ask for {:?}",
                layout.evolve, settings.sdc_evolve
            )));
        }
        if layout.nspec != nspec {
            return Err(BurnError::DimensionMismatch {
                expected: nspec,
                found: layout.nspec,
            });
        }
        for len in [sdc.y.len(), sdc.ydot_a.len()] {
            if len != layout.nvar() {
                return Err(BurnError::DimensionMismatch {
                    expected: layout.nvar(),
                    found: len,
                });
            }
        }
        let sint = layout.seint().or(layout.senth()).ok_or_else(|| {
            BurnError::InvalidConfiguration("conserved layout has no energy slot".to_string())
        })?;
        let seden = layout.seden();
        let rho_in = sdc.density();

        let nw = Self::nw(&layout);
        let nevolve = layout.nevolve();
        let mut work = state.clone();
        work.sdc = None;
        let eos_state = EosState::new(nspec, state.aux.len());
        Ok(Self {
            network,
            eos,
            settings,
            state,
            sdc,
            dt,
            sint,
            seden,
            rho_in,
            energy_in: 0.0,
            work,
            eos_state,
            net_ydot: DVector::zeros(neqs(nspec)),
            net_ydot_pert: DVector::zeros(neqs(nspec)),
            net_jac: DMatrix::zeros(neqs(nspec), neqs(nspec)),
            derivs: EosXDerivatives::new(nspec),
            dRdw: DMatrix::zeros(nevolve + 1, nw),
            dwdU: DMatrix::zeros(nw, nevolve + 1),
        })
    }

    /// number of thermodynamic variables w
    fn nw(layout: &SdcLayout) -> usize {
        match layout.evolve {
            SdcEvolve::Energy => layout.nspec + 3,
            SdcEvolve::Enthalpy => layout.nspec + 2,
        }
    }

    fn kinetic_energy_density(&self) -> f64 {
        match self.sdc.layout.smom() {
            Some(smom) => {
                let rho = self.sdc.density();
                0.5 * smom.iter().map(|i| self.sdc.y[*i] * self.sdc.y[*i]).sum::<f64>() / rho
            }
            None => 0.0,
        }
    }

    /// Density and momenta at time `t` from their pre-burn values and advective rates.
    pub fn fill_unevolved_variables(&mut self, t: f64) {
        let layout = self.sdc.layout;
        if let Some(srho) = layout.srho() {
            self.sdc.y[srho] = self.sdc.rho_orig + self.sdc.ydot_a[srho] * t;
        }
        if let Some(smom) = layout.smom() {
            for (d, i) in smom.iter().enumerate() {
                self.sdc.y[*i] = self.sdc.mom_orig[d] + self.sdc.ydot_a[*i] * t;
            }
        }
    }

    /// Clamp the partial densities into [rho 1e-200, rho]. In energy mode renormalize them when
    /// configured and cap rho e and rho E by the internal energy at `max_temp`.
    fn clean(&mut self) -> Result<(), BurnError> {
        let layout = self.sdc.layout;
        let sfs = layout.sfs();
        let nspec = layout.nspec;
        let rho = self.sdc.density();
        for n in 0..nspec {
            self.sdc.y[sfs + n] = self.sdc.y[sfs + n]
                .min(rho)
                .max(rho * SMALL_PARTIAL_DENSITY);
        }
        if layout.evolve != SdcEvolve::Energy {
            return Ok(());
        }
        if self.settings.renormalize_abundances {
            let sum: f64 = (0..nspec).map(|n| self.sdc.y[sfs + n]).sum::<f64>() / rho;
            for n in 0..nspec {
                self.sdc.y[sfs + n] /= sum;
            }
        }

        self.eos_state.rho = rho;
        self.eos_state.T = self.settings.max_temp;
        for n in 0..nspec {
            self.eos_state.xn[n] = self.sdc.y[sfs + n] / rho;
        }
        self.eos_state.aux.copy_from(&self.work.aux);
        call_eos(self.network, self.eos, EosInput::RT, &mut self.eos_state)?;
        let max_rhoe = rho * self.eos_state.e;
        self.sdc.y[self.sint] = self.sdc.y[self.sint].min(max_rhoe);
        if let Some(seden) = self.seden {
            let ke = self.kinetic_energy_density();
            self.sdc.y[seden] = self.sdc.y[seden].min(max_rhoe + ke);
        }
        Ok(())
    }

    /// Thermodynamic state of the conserved data: an EOS inversion in (rho, e), (rho, h) or
    /// (rho, p) starting from sqrt(T_min T_max).
    fn vode_to_burn(&mut self) -> Result<(), BurnError> {
        let layout = self.sdc.layout;
        let sfs = layout.sfs();
        let rho = self.sdc.density();
        self.eos_state.rho = rho;
        for n in 0..layout.nspec {
            self.eos_state.xn[n] = self.sdc.y[sfs + n] / rho;
        }
        self.eos_state.aux.copy_from(&self.work.aux);
        self.eos_state.T = (self.eos.mintemp() * self.eos.maxtemp()).sqrt();
        let input = match layout.evolve {
            SdcEvolve::Energy => {
                self.eos_state.e = match self.seden {
                    Some(seden) if self.sdc.T_from_eden => {
                        (self.sdc.y[seden] - self.kinetic_energy_density()) / rho
                    }
                    _ => self.sdc.y[self.sint] / rho,
                };
                EosInput::RE
            }
            SdcEvolve::Enthalpy => {
                if self.settings.use_tfromp {
                    self.eos_state.p = self.sdc.p0;
                    EosInput::RP
                } else {
                    self.eos_state.h = self.sdc.y[self.sint] / rho;
                    EosInput::RH
                }
            }
        };
        call_eos(self.network, self.eos, input, &mut self.eos_state)?;
        self.work.eos_to_burn(&self.eos_state);
        Ok(())
    }

    /// load `y` at time `t` into the working conserved data and the work state
    fn evaluate(&mut self, t: f64, y: &DVector<f64>) -> Result<(), BurnError> {
        for i in 0..self.sdc.layout.nevolve() {
            self.sdc.y[i] = y[i];
        }
        self.fill_unevolved_variables(t);
        self.clean()?;
        self.vode_to_burn()
    }

    /// network rates of the work state, species as dX/dt
    fn network_rates(&mut self) -> Result<(), BurnError> {
        self.network.actual_rhs(&self.work, &mut self.net_ydot)?;
        ydot_y_to_x(self.network.aion(), &mut self.net_ydot);
        Ok(())
    }

    /// advective sources plus rho dX/dt for the species and rho e_nuc_dot for the energies
    fn rhs_to_vode(&self, ydot: &mut DVector<f64>) {
        let layout = self.sdc.layout;
        let nspec = layout.nspec;
        let sfs = layout.sfs();
        let rho = self.work.rho;
        for i in 0..layout.nevolve() {
            ydot[i] = self.sdc.ydot_a[i];
        }
        for n in 0..nspec {
            ydot[sfs + n] += rho * self.net_ydot[n];
        }
        let enuc = self.net_ydot[net_ienuc(nspec)];
        for slot in self.energy_slots() {
            ydot[slot] += rho * enuc;
        }
    }

    /// slots receiving the nuclear energy release
    fn energy_slots(&self) -> iter::Chain<option::IntoIter<usize>, iter::Once<usize>> {
        self.seden.into_iter().chain(iter::once(self.sint))
    }

    /// d(reaction terms)/dw, `drho` the density perturbation used for the rho column
    fn fill_dRdw(&mut self, drho: f64) {
        let layout = self.sdc.layout;
        let nspec = layout.nspec;
        let sfs = layout.sfs();
        let itemp = net_itemp(nspec);
        let ienuc = net_ienuc(nspec);
        let iwT = Self::nw(&layout) - 1;
        let rho = self.work.rho;

        self.dRdw.fill(0.0);
        let rows = (0..nspec)
            .map(|m| (sfs + m, m))
            .chain(self.energy_slots().map(|slot| (slot, ienuc)));
        for (row, m) in rows {
            let dydrho = (self.net_ydot_pert[m] - self.net_ydot[m]) / drho;
            self.dRdw[(row, IWRHO)] = self.net_ydot[m] + rho * dydrho;
            for n in 0..nspec {
                self.dRdw[(row, IWFS + n)] = rho * self.net_jac[(m, n)];
            }
            self.dRdw[(row, iwT)] = rho * self.net_jac[(m, itemp)];
        }
    }

    /// dw/dU at the current work state, the last column is the auxiliary density
    fn fill_dwdU(&mut self) {
        let layout = self.sdc.layout;
        let nspec = layout.nspec;
        let sfs = layout.sfs();
        let aux = layout.nevolve();
        let iwT = Self::nw(&layout) - 1;
        let rho = self.work.rho;

        self.dwdU.fill(0.0);
        self.dwdU[(IWRHO, aux)] = 1.0;
        for m in 0..nspec {
            self.dwdU[(IWFS + m, sfs + m)] = 1.0 / rho;
            self.dwdU[(IWFS + m, aux)] = -self.work.xn[m] / rho;
        }

        composition_derivatives(self.network, &self.eos_state, &mut self.derivs);
        let xdqdx = |dqdX: &DVector<f64>, xn: &DVector<f64>| -> f64 {
            (0..nspec).map(|n| xn[n] * dqdX[n]).sum()
        };
        match layout.evolve {
            SdcEvolve::Energy => {
                let iwK = nspec + 1;
                if let Some(seden) = self.seden {
                    let K = (self.sdc.y[seden] - self.sdc.y[self.sint]) / rho;
                    self.dwdU[(iwK, aux)] = -K / rho;
                    self.dwdU[(iwK, seden)] = 1.0 / rho;
                    self.dwdU[(iwK, self.sint)] = -1.0 / rho;
                }
                // T(rho, X, e) with e from rho e, or from rho E minus the kinetic energy
                let dedT = self.eos_state.dedT;
                let e_slot = match self.seden {
                    Some(seden) if self.sdc.T_from_eden => seden,
                    _ => self.sint,
                };
                self.dwdU[(iwT, e_slot)] = 1.0 / (rho * dedT);
                for n in 0..nspec {
                    self.dwdU[(iwT, sfs + n)] = -self.derivs.dedX[n] / (rho * dedT);
                }
                self.dwdU[(iwT, aux)] = (xdqdx(&self.derivs.dedX, &self.work.xn)
                    - rho * self.eos_state.dedr
                    - self.eos_state.e)
                    / (rho * dedT);
            }
            SdcEvolve::Enthalpy if self.settings.use_tfromp => {
                // T(rho, X, p0)
                let dpdT = self.eos_state.dpdT;
                for n in 0..nspec {
                    self.dwdU[(iwT, sfs + n)] = -self.derivs.dpdX[n] / (rho * dpdT);
                }
                self.dwdU[(iwT, aux)] = (xdqdx(&self.derivs.dpdX, &self.work.xn)
                    - rho * self.eos_state.dpdr)
                    / (rho * dpdT);
            }
            SdcEvolve::Enthalpy => {
                let dhdT = self.eos_state.dhdT;
                self.dwdU[(iwT, self.sint)] = 1.0 / (rho * dhdT);
                for n in 0..nspec {
                    self.dwdU[(iwT, sfs + n)] = -self.derivs.dhdX[n] / (rho * dhdT);
                }
                self.dwdU[(iwT, aux)] = (xdqdx(&self.derivs.dhdX, &self.work.xn)
                    - rho * self.eos_state.dhdr
                    - self.eos_state.h)
                    / (rho * dhdT);
            }
        }

        if layout.evolve == SdcEvolve::Enthalpy {
            // rho = sum(rho X)
            for k in 0..self.dwdU.nrows() {
                let d = self.dwdU[(k, aux)];
                for n in 0..nspec {
                    self.dwdU[(k, sfs + n)] += d;
                }
            }
        }
    }

    /// Jacobian of the evolved variables, J = (dR/dw dw/dU) without the auxiliary density.
    fn jac_to_vode(&self, jac: &mut DMatrix<f64>) {
        let nevolve = self.sdc.layout.nevolve();
        let nw = self.dRdw.ncols();
        for m in 0..nevolve {
            for n in 0..nevolve {
                let mut sum = 0.0;
                for k in 0..nw {
                    sum += self.dRdw[(m, k)] * self.dwdU[(k, n)];
                }
                jac[(m, n)] = sum;
            }
        }
    }
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> OdeSystem for SdcSystem<'a, N, E> {
    fn rhs(&mut self, t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        self.evaluate(t, y)?;
        self.network_rates()?;
        self.rhs_to_vode(ydot);
        Ok(())
    }

    fn jac(&mut self, t: f64, y: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
        self.evaluate(t, y)?;
        let network = self.network;
        let aion = network.aion();
        self.net_jac.fill(0.0);
        network.actual_jac(&self.work, &mut self.net_jac)?;
        jac_y_to_x(aion, &mut self.net_jac);
        self.network_rates()?;

        let rho = self.work.rho;
        let drho = DENSITY_EPS * rho;
        self.work.rho = rho + drho;
        let perturbed = network.actual_rhs(&self.work, &mut self.net_ydot_pert);
        self.work.rho = rho;
        perturbed?;
        ydot_y_to_x(aion, &mut self.net_ydot_pert);

        self.fill_dRdw(drho);
        self.fill_dwdU();
        self.jac_to_vode(jac);
        Ok(())
    }

    fn analytic_jacobian(&self) -> bool {
        self.settings.jacobian == JacobianMode::Analytic && self.network.has_analytic_jacobian()
    }
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> CouplingLayer for SdcSystem<'a, N, E> {
    fn neq(&self) -> usize {
        self.sdc.layout.nevolve()
    }

    fn species_range(&self) -> Range<usize> {
        let sfs = self.sdc.layout.sfs();
        sfs..sfs + self.sdc.layout.nspec
    }

    fn tolerances(&self, rtol: &mut DVector<f64>, atol: &mut DVector<f64>) {
        for n in self.species_range() {
            rtol[n] = self.settings.rtol_spec;
            atol[n] = self.settings.atol_spec * self.rho_in;
        }
        for slot in self.energy_slots() {
            rtol[slot] = self.settings.rtol_enuc;
            atol[slot] = self.settings.atol_enuc * self.rho_in;
        }
    }

    fn pack(&mut self, y: &mut DVector<f64>) -> Result<(), BurnError> {
        let layout = self.sdc.layout;
        self.sdc.rho_orig = self.sdc.density();
        if let Some(smom) = layout.smom() {
            for (d, i) in smom.iter().enumerate() {
                self.sdc.mom_orig[d] = self.sdc.y[*i];
            }
        }
        self.energy_in = self.sdc.y[self.sint];
        for i in 0..layout.nevolve() {
            y[i] = self.sdc.y[i];
        }
        self.evaluate(0.0, &*y)
    }

    fn plausible(&self, y: &DVector<f64>) -> bool {
        let layout = self.sdc.layout;
        let sfs = layout.sfs();
        let rho = match layout.srho() {
            Some(srho) => self.sdc.rho_orig + self.sdc.ydot_a[srho] * self.dt,
            None => (0..layout.nspec).map(|n| y[sfs + n]).sum(),
        };
        if !(rho > 0.0) {
            return false;
        }
        plausible_mass_fractions((0..layout.nspec).map(|n| y[sfs + n] / rho))
    }

    fn unpack(&mut self, y: &DVector<f64>) -> Result<(), BurnError> {
        for i in 0..self.sdc.layout.nevolve() {
            self.sdc.y[i] = y[i];
        }
        self.fill_unevolved_variables(self.dt);
        self.vode_to_burn()?;
        self.state.eos_to_burn(&self.eos_state);
        self.state.normalize_abundances(self.settings.small_x_safe);
        let released = self.sdc.y[self.sint] - self.energy_in - self.sdc.ydot_a[self.sint] * self.dt;
        self.state.e_nuc = released / self.eos_state.rho;
        self.state.sdc = Some(self.sdc.clone());
        Ok(())
    }

    fn state(&self) -> &BurnState {
        &*self.state
    }

    fn state_mut(&mut self) -> &mut BurnState {
        &mut *self.state
    }

    fn settings(&self) -> &BurnerSettings {
        self.settings
    }
}
