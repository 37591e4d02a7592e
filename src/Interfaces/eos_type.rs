//! # Equation of state interface
//!
//! ## Purpose
//! The EOS closes the thermodynamic state: given density and one more independent variable
//! (temperature, specific internal energy, specific enthalpy or pressure) together with the
//! composition, it fills every other thermodynamic quantity and its partial derivatives.
//!
//! ## Main Structures
//! - `EosInput`: which pair of variables is given
//! - `EosState`: the record read and filled by an EOS call
//! - `Eos`: the trait every equation of state implements
//!
//! The composition means (`abar`, `zbar`, `y_e`) must be set before a call, see
//! [`crate::Interfaces::eos_composition::call_eos`] which does both.
use crate::Interfaces::errors::EosError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// independent variables of an EOS call, density is always one of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EosInput {
    /// density and temperature
    RT,
    /// density and specific internal energy
    RE,
    /// density and specific enthalpy
    RH,
    /// density and pressure
    RP,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EosState {
    pub rho: f64,
    pub T: f64,
    pub e: f64,
    pub h: f64,
    pub p: f64,
    pub xn: DVector<f64>,
    pub aux: DVector<f64>,
    pub abar: f64,
    pub zbar: f64,
    pub y_e: f64,
    pub mu_e: f64,
    pub cv: f64,
    pub cp: f64,
    pub dedT: f64,
    pub dedr: f64,
    pub dpdT: f64,
    pub dpdr: f64,
    pub dhdT: f64,
    pub dhdr: f64,
    /// derivatives with respect to abar and zbar, used for mass-fraction derivatives
    pub dedA: f64,
    pub dedZ: f64,
    pub dpdA: f64,
    pub dpdZ: f64,
    pub gam1: f64,
    pub cs: f64,
    pub eta: f64,
}

impl EosState {
    pub fn new(nspec: usize, naux: usize) -> Self {
        Self {
            rho: 0.0,
            T: 0.0,
            e: 0.0,
            h: 0.0,
            p: 0.0,
            xn: DVector::zeros(nspec),
            aux: DVector::zeros(naux),
            abar: 0.0,
            zbar: 0.0,
            y_e: 0.0,
            mu_e: 0.0,
            cv: 0.0,
            cp: 0.0,
            dedT: 0.0,
            dedr: 0.0,
            dpdT: 0.0,
            dpdr: 0.0,
            dhdT: 0.0,
            dhdr: 0.0,
            dedA: 0.0,
            dedZ: 0.0,
            dpdA: 0.0,
            dpdZ: 0.0,
            gam1: 0.0,
            cs: 0.0,
            eta: 0.0,
        }
    }
}

/// An equation of state. Implementations are pure: they read the inputs selected by `input`
/// (plus `xn`, `abar`, `zbar`) and overwrite every other field of `state`.
pub trait Eos {
    fn eos(&self, input: EosInput, state: &mut EosState) -> Result<(), EosError>;
    /// lowest temperature the EOS will return
    fn mintemp(&self) -> f64;
    /// highest temperature the EOS will return
    fn maxtemp(&self) -> f64;
}
