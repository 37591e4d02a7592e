//! # Carbon ignition network
//!
//! A single reaction, 12C + 12C -> 24Mg, with the Caughlan & Fowler (1988) rate:
//!
//! lambda = 4.27e26 T9a^(5/6) T9^(-3/2) exp(-84.165 T9a^(-1/3) - 2.12e-3 T9^3),
//! T9a = T9 / (1 + 0.0396 T9)
//!
//! and dY(12C)/dt = -rho lambda Y(12C)^2, dY(24Mg)/dt = rho lambda Y(12C)^2 / 2. Oxygen is inert.
//! The rate can be read from a tabulated [`RateTable`] built with [`IgnitionSimple::build_rate_table`].
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::{Network, enuc_from_ydot, net_ienuc, net_itemp, neqs};
use crate::Networks::rate_table::RateTable;
use crate::Networks::rhs_terms::{
    RhsTerm, energy_jac_row, molar_abundances, species_jac, species_rhs,
};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

const NSPEC: usize = 3;
pub const IC12: usize = 0;
pub const IO16: usize = 1;
pub const IMG24: usize = 2;

const AION: [f64; NSPEC] = [12.0, 16.0, 24.0];
const ZION: [f64; NSPEC] = [6.0, 8.0, 12.0];
const BION: [f64; NSPEC] = [92.16294, 127.62093, 198.2579];
const NAMES: [&str; NSPEC] = ["carbon-12", "oxygen-16", "magnesium-24"];

/// Caughlan & Fowler 12C + 12C rate and its temperature derivative, without the density factor
pub fn c12c12_rate(T: f64) -> (f64, f64) {
    if !(T > 0.0) {
        return (0.0, 0.0);
    }
    let T9 = T / 1.0e9;
    let denom = 1.0 + 0.0396 * T9;
    let T9a = T9 / denom;
    let dT9a_dT9 = 1.0 / (denom * denom);

    let a = 4.27e26 * T9a.powf(5.0 / 6.0) * T9.powf(-1.5);
    let dlna = 5.0 / 6.0 * dT9a_dT9 / T9a - 1.5 / T9;

    let t9a13 = T9a.cbrt();
    let b = (-84.165 / t9a13 - 2.12e-3 * T9 * T9 * T9).exp();
    let dlnb = 84.165 / 3.0 * dT9a_dT9 / (t9a13 * T9a) - 3.0 * 2.12e-3 * T9 * T9;

    let rate = a * b;
    (rate, rate * (dlna + dlnb) / 1.0e9)
}

#[derive(Debug, Clone)]
pub struct IgnitionSimple {
    terms: Vec<RhsTerm>,
    table: Option<Arc<RateTable>>,
}

impl Default for IgnitionSimple {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnitionSimple {
    pub fn new() -> Self {
        Self {
            terms: vec![
                RhsTerm::new(IC12, -1.0, &[IC12, IC12], 0),
                RhsTerm::new(IMG24, 0.5, &[IC12, IC12], 0),
            ],
            table: None,
        }
    }

    /// tabulate the carbon burning rate; the table is linear in density
    pub fn build_rate_table() -> Result<Arc<RateTable>, BurnError> {
        let table = RateTable::build(vec![1], |T, r, dr| {
            let (rate, drate) = c12c12_rate(T);
            r[0] = rate;
            dr[0] = drate;
        })?;
        Ok(Arc::new(table))
    }

    pub fn with_rate_table(mut self, table: Arc<RateTable>) -> Result<Self, BurnError> {
        if table.nrates() != 1 {
            return Err(BurnError::DimensionMismatch {
                expected: 1,
                found: table.nrates(),
            });
        }
        self.table = Some(table);
        Ok(self)
    }

    /// rho lambda and its temperature derivative
    fn rates(&self, rho: f64, T: f64) -> ([f64; 1], [f64; 1]) {
        let mut rates = [0.0];
        let mut drates = [0.0];
        match &self.table {
            Some(table) if table.covers(T) => table.evaluate(rho, T, &mut rates, &mut drates),
            _ => {
                let (r, dr) = c12c12_rate(T);
                rates[0] = rho * r;
                drates[0] = rho * dr;
            }
        }
        (rates, drates)
    }

    fn check(state: &BurnState) -> Result<(), BurnError> {
        if state.nspec() != NSPEC {
            return Err(BurnError::DimensionMismatch {
                expected: NSPEC,
                found: state.nspec(),
            });
        }
        Ok(())
    }
}

impl Network for IgnitionSimple {
    fn name(&self) -> &str {
        "ignition_simple"
    }
    fn nspec(&self) -> usize {
        NSPEC
    }
    fn naux(&self) -> usize {
        0
    }
    fn aion(&self) -> &[f64] {
        &AION
    }
    fn zion(&self) -> &[f64] {
        &ZION
    }
    fn bion(&self) -> &[f64] {
        &BION
    }
    fn species_names(&self) -> &[&'static str] {
        &NAMES
    }

    fn actual_rhs(&self, state: &BurnState, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        Self::check(state)?;
        let mut ymol = [0.0; NSPEC];
        molar_abundances(&state.xn, &AION, &mut ymol);
        let (rates, _) = self.rates(state.rho, state.T);
        species_rhs(&self.terms, &ymol, &rates, ydot);
        ydot[net_itemp(NSPEC)] = 0.0;
        ydot[net_ienuc(NSPEC)] = enuc_from_ydot(&BION, ydot);
        Ok(())
    }

    fn has_analytic_jacobian(&self) -> bool {
        true
    }

    fn actual_jac(&self, state: &BurnState, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
        Self::check(state)?;
        if jac.nrows() != neqs(NSPEC) {
            return Err(BurnError::DimensionMismatch {
                expected: neqs(NSPEC),
                found: jac.nrows(),
            });
        }
        jac.fill(0.0);
        let mut ymol = [0.0; NSPEC];
        molar_abundances(&state.xn, &AION, &mut ymol);
        let (rates, drates) = self.rates(state.rho, state.T);
        species_jac(&self.terms, &ymol, &rates, &drates, jac);
        energy_jac_row(&BION, jac);
        Ok(())
    }
}
