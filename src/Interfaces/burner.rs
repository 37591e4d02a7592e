//! # Burner
//!
//! ## Purpose
//! Entry point for one burn of one fluid element. The burner checks the configuration and the
//! shape of the state, hands states in nuclear statistical equilibrium to an NSE shortcut when one
//! is attached, and otherwise runs the integrator and coupling selected in the settings.
//!
//! ## Main Structures
//! - `Burner`: borrows the network, the EOS, the settings and an optional NSE shortcut.
//!   `try_burn` reports setup errors as `Err`; `burn` folds them into the state's success flag.
//!
//! The NSE shortcut only intercepts operator-split burns: a simplified-SDC burn always goes
//! through the integrator.
use crate::Integration::integrator;
use crate::Integration::vode_type::VodeStatistics;
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::eos_type::Eos;
use crate::Interfaces::errors::{BurnError, IntegrationStatus};
use crate::Interfaces::network::Network;
use crate::Interfaces::nse::NseShortcut;
use crate::settings::{BurnerSettings, CouplingKind};
use log::{error, info};

pub struct Burner<'a, N: Network + ?Sized, E: Eos + ?Sized> {
    network: &'a N,
    eos: &'a E,
    settings: &'a BurnerSettings,
    nse: Option<&'a dyn NseShortcut>,
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> Burner<'a, N, E> {
    pub fn new(network: &'a N, eos: &'a E, settings: &'a BurnerSettings) -> Self {
        Self {
            network,
            eos,
            settings,
            nse: None,
        }
    }

    /// attach an NSE shortcut for operator-split burns
    pub fn with_nse(mut self, nse: &'a dyn NseShortcut) -> Self {
        self.nse = Some(nse);
        self
    }

    pub fn network(&self) -> &N {
        self.network
    }

    pub fn settings(&self) -> &BurnerSettings {
        self.settings
    }

    fn check_state(&self, state: &BurnState) -> Result<(), BurnError> {
        if state.nspec() != self.network.nspec() {
            return Err(BurnError::DimensionMismatch {
                expected: self.network.nspec(),
                found: state.nspec(),
            });
        }
        if state.aux.len() < self.network.naux() {
            return Err(BurnError::DimensionMismatch {
                expected: self.network.naux(),
                found: state.aux.len(),
            });
        }
        if !(state.rho > 0.0) || !state.rho.is_finite() {
            return Err(BurnError::InvalidConfiguration(format!(
                "density {} is not positive",
                state.rho
            )));
        }
        if !(state.T > 0.0) || !state.T.is_finite() {
            return Err(BurnError::InvalidConfiguration(format!(
                "temperature {} is not positive",
                state.T
            )));
        }
        Ok(())
    }

    /// Burn `state` over `dt`. Integration failures are reported on the state and in the
    /// returned statistics; `Err` is returned only when the burn cannot be set up.
    pub fn try_burn(&self, state: &mut BurnState, dt: f64) -> Result<VodeStatistics, BurnError> {
        self.settings.validate()?;
        self.check_state(state)?;
        if !(dt >= 0.0) || !dt.is_finite() {
            return Err(BurnError::InvalidConfiguration(format!(
                "timestep {} is negative or not finite",
                dt
            )));
        }

        match self.settings.coupling {
            CouplingKind::Strang => {
                if let Some(nse) = self.nse {
                    if nse.in_nse(state) {
                        nse.nse_burn(state, dt)?;
                        if self.settings.burner_verbose {
                            info!(
                                "NSE burn: dens {:e} temp {:e} energy released {:e}",
                                state.rho, state.T, state.e_nuc
                            );
                        }
                        return Ok(VodeStatistics {
                            time: dt,
                            status: Some(IntegrationStatus::Success),
                            ..VodeStatistics::default()
                        });
                    }
                }
                let stats = integrator(self.network, self.eos, self.settings, state, dt)?;
                if let Some(nse) = self.nse {
                    if state.success {
                        nse.set_aux_from_X(state);
                    }
                }
                Ok(stats)
            }
            CouplingKind::SimplifiedSdc => {
                integrator(self.network, self.eos, self.settings, state, dt)
            }
        }
    }

    /// Burn `state` over `dt`, logging setup errors and marking the state as failed.
    pub fn burn(&self, state: &mut BurnState, dt: f64) -> VodeStatistics {
        match self.try_burn(state, dt) {
            Ok(stats) => stats,
            Err(e) => {
                error!("burn could not be started: {}", e);
                state.success = false;
                state.status = IntegrationStatus::ClosureFailure;
                VodeStatistics {
                    status: Some(IntegrationStatus::ClosureFailure),
                    ..VodeStatistics::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Eos::gamma_law::GammaLaw;
    use crate::Interfaces::burn_type::{SdcData, SdcEvolve};
    use crate::Interfaces::eos_composition::call_eos;
    use crate::Interfaces::eos_type::{EosInput, EosState};
    use crate::Networks::ignition_simple::{IC12, IgnitionSimple};
    use crate::Networks::{NetworkKind, create_network_by_name};
    use crate::settings::IntegratorKind;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// shortcut that claims every state above a temperature and counts its calls
    struct HotNse {
        T_min: f64,
        burns: Cell<usize>,
        aux_updates: Cell<usize>,
    }

    impl HotNse {
        fn new(T_min: f64) -> Self {
            Self {
                T_min,
                burns: Cell::new(0),
                aux_updates: Cell::new(0),
            }
        }
    }

    impl NseShortcut for HotNse {
        fn in_nse(&self, state: &BurnState) -> bool {
            state.T > self.T_min
        }
        fn nse_burn(&self, state: &mut BurnState, dt: f64) -> Result<(), BurnError> {
            self.burns.set(self.burns.get() + 1);
            state.e_nuc = 1.0e10 * dt;
            state.e += state.e_nuc;
            state.success = true;
            state.status = IntegrationStatus::Success;
            Ok(())
        }
        fn set_aux_from_X(&self, _state: &mut BurnState) {
            self.aux_updates.set(self.aux_updates.get() + 1);
        }
    }

    #[test]
    fn test_burn_with_defaults() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let burner = Burner::new(&net, &eos, &settings);
        let mut state = BurnState::new(1.0e8, 2.0e9, vec![0.5, 0.5, 0.0], 0);
        let stats = burner.burn(&mut state, 1.0e-3);
        assert!(state.success);
        assert_eq!(stats.status, Some(IntegrationStatus::Success));
        assert!(state.xn[IC12] < 0.5);
        assert!(state.e_nuc > 0.0);
        assert_relative_eq!(state.xn.sum(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nse_shortcut_intercepts_hot_states() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let nse = HotNse::new(4.0e9);
        let burner = Burner::new(&net, &eos, &settings).with_nse(&nse);

        let mut hot = BurnState::new(1.0e9, 5.0e9, vec![0.0, 0.5, 0.5], 0);
        let xn_in = hot.xn.clone();
        burner.try_burn(&mut hot, 1.0e-3).unwrap();
        assert_eq!(nse.burns.get(), 1);
        assert_eq!(nse.aux_updates.get(), 0);
        assert_relative_eq!(hot.e_nuc, 1.0e7);
        assert_eq!(hot.xn, xn_in);

        let mut cool = BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5, 0.0], 0);
        burner.try_burn(&mut cool, 1.0e-3).unwrap();
        assert_eq!(nse.burns.get(), 1);
        assert_eq!(nse.aux_updates.get(), 1);
        assert!(cool.success);
    }

    #[test]
    fn test_sdc_burns_bypass_nse() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default()
            .with_coupling(CouplingKind::SimplifiedSdc)
            .with_sdc_evolve(SdcEvolve::Energy);
        let nse = HotNse::new(1.0e9);
        let burner = Burner::new(&net, &eos, &settings).with_nse(&nse);

        let xn = [0.5, 0.5, 0.0];
        let mut eos_state = EosState::new(3, 0);
        eos_state.rho = 1.0e8;
        eos_state.T = 1.5e9;
        eos_state.xn.copy_from_slice(&xn);
        call_eos(&net, &eos, EosInput::RT, &mut eos_state).unwrap();
        let data = SdcData::energy_from_primitive(1.0e8, &xn, eos_state.e, [0.0; 3]);
        let mut state = BurnState::new(1.0e8, 1.5e9, xn.to_vec(), 0).with_sdc(data);

        burner.try_burn(&mut state, 1.0e-3).unwrap();
        assert!(state.success);
        assert_eq!(nse.burns.get(), 0);
        assert_eq!(nse.aux_updates.get(), 0);
    }

    #[test]
    fn test_setup_errors() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let burner = Burner::new(&net, &eos, &settings);

        let mut wrong_size = BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5], 0);
        assert!(matches!(
            burner.try_burn(&mut wrong_size, 1.0e-3),
            Err(BurnError::DimensionMismatch { expected: 3, found: 2 })
        ));
        let mut state = BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5, 0.0], 0);
        assert!(burner.try_burn(&mut state, -1.0).is_err());
        let mut empty = BurnState::new(0.0, 1.5e9, vec![0.5, 0.5, 0.0], 0);
        let stats = burner.burn(&mut empty, 1.0e-3);
        assert!(!empty.success);
        assert_eq!(empty.status, IntegrationStatus::ClosureFailure);
        assert_eq!(stats.status, Some(IntegrationStatus::ClosureFailure));

        let bad = BurnerSettings::default()
            .with_integrator(IntegratorKind::ForwardEuler)
            .with_coupling(CouplingKind::SimplifiedSdc);
        let burner = Burner::new(&net, &eos, &bad);
        let mut state = BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5, 0.0], 0);
        assert!(matches!(
            burner.try_burn(&mut state, 1.0e-3),
            Err(BurnError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_forward_euler_and_network_kind() {
        let net: NetworkKind = create_network_by_name("ignition_simple").unwrap();
        let eos = GammaLaw::default();
        let vode = BurnerSettings::default();
        let euler = BurnerSettings::default().with_integrator(IntegratorKind::ForwardEuler);
        let mut a = BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5, 0.0], 0);
        let mut b = a.clone();
        Burner::new(&net, &eos, &vode).burn(&mut a, 1.0e-2);
        Burner::new(&net, &eos, &euler).burn(&mut b, 1.0e-2);
        assert!(a.success && b.success);
        // first order with 1 % substeps
        assert_relative_eq!(a.e_nuc, b.e_nuc, max_relative = 2e-2);
        assert_relative_eq!(a.xn[IC12], b.xn[IC12], max_relative = 1e-3);
    }
}
