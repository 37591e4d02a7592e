//! # Composition
//!
//! Mean nucleon number `abar`, mean charge `zbar`, electron fraction `y_e` and their use in
//! mass-fraction derivatives of the EOS quantities.
//!
//! The means are computed from the normalized composition, `abar = sum(X) / sum(X/A)` and
//! `y_e = sum(X Z/A) / sum(X)`, so that for a composition summing to one
//!
//! d(abar)/dX_n = abar/A_n (A_n - abar),   d(zbar)/dX_n = abar/A_n (Z_n - zbar)
//!
//! are the exact derivatives used by [`composition_derivatives`].
use crate::Interfaces::eos_type::{Eos, EosInput, EosState};
use crate::Interfaces::errors::EosError;
use crate::Interfaces::network::Network;
use nalgebra::DVector;

/// derivatives of e, p and h with respect to each mass fraction at constant (rho, T)
#[derive(Debug, Clone)]
pub struct EosXDerivatives {
    pub dedX: DVector<f64>,
    pub dpdX: DVector<f64>,
    pub dhdX: DVector<f64>,
}

impl EosXDerivatives {
    pub fn new(nspec: usize) -> Self {
        Self {
            dedX: DVector::zeros(nspec),
            dpdX: DVector::zeros(nspec),
            dhdX: DVector::zeros(nspec),
        }
    }
}

/// fill abar, zbar, y_e and mu_e of `state` from its mass fractions
pub fn composition<N: Network + ?Sized>(network: &N, state: &mut EosState) {
    let aion = network.aion();
    let zion = network.zion();
    let mut xsum = 0.0;
    let mut ysum = 0.0;
    let mut zsum = 0.0;
    for n in 0..aion.len() {
        let x = state.xn[n];
        xsum += x;
        ysum += x / aion[n];
        zsum += x * zion[n] / aion[n];
    }
    state.abar = xsum / ysum;
    state.y_e = zsum / xsum;
    state.mu_e = 1.0 / state.y_e;
    state.zbar = state.abar * state.y_e;
}

/// fill `derivs` with dedX, dpdX and dhdX for the thermodynamic point of `state`
pub fn composition_derivatives<N: Network + ?Sized>(
    network: &N,
    state: &EosState,
    derivs: &mut EosXDerivatives,
) {
    let aion = network.aion();
    let zion = network.zion();
    for n in 0..aion.len() {
        let dabar = state.abar / aion[n] * (aion[n] - state.abar);
        let dzbar = state.abar / aion[n] * (zion[n] - state.zbar);
        derivs.dpdX[n] = state.dpdA * dabar + state.dpdZ * dzbar;
        derivs.dedX[n] = state.dedA * dabar + state.dedZ * dzbar;
        derivs.dhdX[n] = if state.dpdr != 0.0 {
            derivs.dedX[n]
                + (state.p / (state.rho * state.rho) - state.dedr) * derivs.dpdX[n] / state.dpdr
        } else {
            derivs.dedX[n]
        };
    }
}

/// composition followed by an EOS call
pub fn call_eos<N: Network + ?Sized, E: Eos + ?Sized>(
    network: &N,
    eos: &E,
    input: EosInput,
    state: &mut EosState,
) -> Result<(), EosError> {
    composition(network, state);
    eos.eos(input, state)
}
