//! # Coupling layers
//!
//! A coupling layer maps a burn state to the vector the BDF integrator evolves and back. It also
//! supplies the right-hand side and Jacobian of that vector (through [`OdeSystem`]), the
//! per-equation tolerances and the physical plausibility checks applied after a converged
//! integration.
//!
//! | layer | integrated vector | unevolved |
//! |-------|-------------------|-----------|
//! | [`StrangSystem`] | `[X_1..X_N, T, e]` | density |
//! | [`SdcSystem`], energy | `[rho E, rho e, rho X_1..rho X_N]` | density, momenta |
//! | [`SdcSystem`], enthalpy | `[rho X_1..rho X_N, rho h]` | density = sum(rho X) |
//!
//! [`Coupling`] selects the layer from the settings; the per-step code is generic over
//! [`CouplingLayer`].
use crate::Integration::dvode::OdeSystem;
use crate::Integration::simplified_sdc::SdcSystem;
use crate::Integration::strang::StrangSystem;
use crate::Integration::vode_integrator::actual_integrator;
use crate::Integration::vode_type::{VODE_FAILURE_TOLERANCE, VodeStatistics};
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::eos_type::Eos;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::Network;
use crate::settings::{BurnerSettings, CouplingKind};
use nalgebra::DVector;
use std::ops::Range;

pub trait CouplingLayer: OdeSystem {
    /// length of the integrated vector
    fn neq(&self) -> usize;
    /// slots of the integrated vector holding species
    fn species_range(&self) -> Range<usize>;
    fn tolerances(&self, rtol: &mut DVector<f64>, atol: &mut DVector<f64>);
    /// Prepare the burn state (initial EOS call, stored pre-burn values) and fill the initial
    /// integration vector.
    fn pack(&mut self, y: &mut DVector<f64>) -> Result<(), BurnError>;
    /// Post-hoc checks on the integrated vector at the end time.
    fn plausible(&self, y: &DVector<f64>) -> bool;
    /// Write the end-time vector back into the burn state.
    fn unpack(&mut self, y: &DVector<f64>) -> Result<(), BurnError>;
    fn state(&self) -> &BurnState;
    fn state_mut(&mut self) -> &mut BurnState;
    fn settings(&self) -> &BurnerSettings;
}

/// true when every mass fraction lies in [-tol, 1 + tol]
pub fn plausible_mass_fractions<I: IntoIterator<Item = f64>>(xn: I) -> bool {
    xn.into_iter()
        .all(|x| x.is_finite() && x >= -VODE_FAILURE_TOLERANCE && x <= 1.0 + VODE_FAILURE_TOLERANCE)
}

/// plausible mass fractions and a temperature that is not negative
pub fn plausible_composition<I: IntoIterator<Item = f64>>(xn: I, T: f64) -> bool {
    if T < 0.0 || !T.is_finite() {
        return false;
    }
    plausible_mass_fractions(xn)
}

/// the coupling layer chosen for one burn
pub enum Coupling<'a, N: Network + ?Sized, E: Eos + ?Sized> {
    Strang(StrangSystem<'a, N, E>),
    SimplifiedSdc(SdcSystem<'a, N, E>),
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> Coupling<'a, N, E> {
    pub fn new(
        network: &'a N,
        eos: &'a E,
        settings: &'a BurnerSettings,
        state: &'a mut BurnState,
        dt: f64,
    ) -> Result<Self, BurnError> {
        match settings.coupling {
            CouplingKind::Strang => Ok(Coupling::Strang(StrangSystem::new(
                network, eos, settings, state,
            ))),
            CouplingKind::SimplifiedSdc => Ok(Coupling::SimplifiedSdc(SdcSystem::new(
                network, eos, settings, state, dt,
            )?)),
        }
    }

    pub fn kind(&self) -> CouplingKind {
        match self {
            Coupling::Strang(_) => CouplingKind::Strang,
            Coupling::SimplifiedSdc(_) => CouplingKind::SimplifiedSdc,
        }
    }

    /// Integrate the burn state over `dt` with the BDF integrator.
    pub fn integrate(&mut self, dt: f64) -> VodeStatistics {
        match self {
            Coupling::Strang(system) => actual_integrator(system, dt),
            Coupling::SimplifiedSdc(system) => actual_integrator(system, dt),
        }
    }
}
