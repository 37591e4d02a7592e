/// dense LU factorization and solve for the Newton iteration matrix
pub mod linear_algebra;
/// BDF constants, controls, workspace and statistics
pub mod vode_type;
/// the BDF driver: initial step, step loop and interpolation to the output time
pub mod dvode;
/// one BDF step: predictor, Newton corrector, error test, step and order selection
pub mod dvstep;
/// the interface between burn states and the integrated vector
pub mod coupling;
/// operator-split coupling at constant density
pub mod strang;
/// coupling of conserved variables with advective sources
pub mod simplified_sdc;
/// one burn through the BDF integrator
pub mod vode_integrator;
/// explicit fallback integrator with adaptive substeps
/// # Examples
/// ```
/// use NuBurn::Eos::gamma_law::GammaLaw;
/// use NuBurn::Integration::forward_euler::forward_euler;
/// use NuBurn::Interfaces::burn_type::BurnState;
/// use NuBurn::Networks::test_networks::PureHeating;
/// use NuBurn::settings::BurnerSettings;
///
/// let network = PureHeating::new(1.0e15);
/// let eos = GammaLaw::default();
/// let settings = BurnerSettings::default();
/// let mut state = BurnState::new(1.0e6, 1.0e8, vec![1.0], 0);
/// forward_euler(&network, &eos, &settings, &mut state, 1.0e-3);
/// assert!(state.success);
/// assert!((state.e_nuc - 1.0e12).abs() < 1.0);
/// ```
pub mod forward_euler;
#[cfg(test)]
mod vode_tests;

use crate::Integration::coupling::Coupling;
use crate::Integration::forward_euler::forward_euler;
use crate::Integration::vode_type::VodeStatistics;
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::eos_type::Eos;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::Network;
use crate::settings::{BurnerSettings, CouplingKind, IntegratorKind};

/// Integrate `state` over `dt` with the integrator and coupling chosen in `settings`.
/// Integration failures are reported on the state; `Err` means the burn could not be set up.
pub fn integrator<N: Network + ?Sized, E: Eos + ?Sized>(
    network: &N,
    eos: &E,
    settings: &BurnerSettings,
    state: &mut BurnState,
    dt: f64,
) -> Result<VodeStatistics, BurnError> {
    match (settings.integrator, settings.coupling) {
        (IntegratorKind::ForwardEuler, CouplingKind::Strang) => {
            Ok(forward_euler(network, eos, settings, state, dt))
        }
        (IntegratorKind::ForwardEuler, CouplingKind::SimplifiedSdc) => {
            Err(BurnError::InvalidConfiguration(
                "the forward Euler integrator supports Strang coupling only".to_owned(),
            ))
        }
        (IntegratorKind::Vode, _) => {
            let mut coupling = Coupling::new(network, eos, settings, state, dt)?;
            Ok(coupling.integrate(dt))
        }
    }
}
