//! # Reaction network interface
//!
//! A network evaluates the reaction right-hand side and, optionally, its analytic Jacobian for a
//! given burn state. The vectors it fills have the network layout
//!
//! | index            | content                                   |
//! |------------------|-------------------------------------------|
//! | `0..nspec`       | dY/dt, molar abundances Y = X/A           |
//! | `net_itemp`      | temperature slot, left for the integrator |
//! | `net_ienuc`      | specific energy generation rate, erg/g/s  |
//!
//! The analytic Jacobian is d(ydot)/d(Y, T, e) in the same layout. The temperature row is filled
//! by the integrator (see `temperature_integration`), the energy column is zero.
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::errors::BurnError;
use enum_dispatch::enum_dispatch;
use nalgebra::{DMatrix, DVector};

/// number of equations in the network layout
pub fn neqs(nspec: usize) -> usize {
    nspec + 2
}
/// index of the temperature equation in the network layout
pub fn net_itemp(nspec: usize) -> usize {
    nspec
}
/// index of the energy equation in the network layout
pub fn net_ienuc(nspec: usize) -> usize {
    nspec + 1
}

#[enum_dispatch]
pub trait Network {
    fn name(&self) -> &str;
    fn nspec(&self) -> usize;
    /// number of auxiliary scalars carried with the composition
    fn naux(&self) -> usize;
    /// atomic mass numbers
    fn aion(&self) -> &[f64];
    /// charge numbers
    fn zion(&self) -> &[f64];
    /// binding energies, MeV
    fn bion(&self) -> &[f64];
    fn species_names(&self) -> &[&'static str];
    /// reaction right-hand side in the network layout (species in dY/dt)
    fn actual_rhs(&self, state: &BurnState, ydot: &mut DVector<f64>) -> Result<(), BurnError>;
    fn has_analytic_jacobian(&self) -> bool;
    /// analytic Jacobian in the network layout (species in Y)
    fn actual_jac(&self, state: &BurnState, jac: &mut DMatrix<f64>) -> Result<(), BurnError>;
}

/// energy generation rate from molar abundance derivatives and binding energies (MeV)
pub fn enuc_from_ydot(bion: &[f64], ydot: &DVector<f64>) -> f64 {
    let mut enuc = 0.0;
    for (n, b) in bion.iter().enumerate() {
        enuc += ydot[n] * b;
    }
    enuc * crate::Interfaces::constants::ENUC_CONV
}

/// Convert the species rows and columns of a network-layout Jacobian from molar abundances to
/// mass fractions: rows are multiplied by A, columns divided by A.
pub fn jac_y_to_x(aion: &[f64], jac: &mut DMatrix<f64>) {
    let nspec = aion.len();
    let neq = jac.nrows();
    for n in 0..nspec {
        for m in 0..jac.ncols() {
            jac[(n, m)] *= aion[n];
        }
    }
    for m in 0..neq {
        for n in 0..nspec {
            jac[(m, n)] /= aion[n];
        }
    }
}

/// Convert the species part of a network-layout right-hand side from dY/dt to dX/dt.
pub fn ydot_y_to_x(aion: &[f64], ydot: &mut DVector<f64>) {
    for (n, a) in aion.iter().enumerate() {
        ydot[n] *= a;
    }
}
