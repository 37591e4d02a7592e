/////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::Eos::gamma_law::GammaLaw;
    use crate::Integration::coupling::{Coupling, CouplingLayer};
    use crate::Integration::dvode::{OdeSystem, dvode, ewset, start};
    use crate::Integration::dvstep::{StepOutcome, dvstep};
    use crate::Integration::integrator;
    use crate::Integration::strang::StrangSystem;
    use crate::Integration::vode_integrator::actual_integrator;
    use crate::Integration::vode_type::{DvodeWorkspace, VodeControls};
    use crate::Interfaces::burn_type::{BurnState, SdcData, SdcEvolve};
    use crate::Interfaces::constants::ENUC_CONV;
    use crate::Interfaces::eos_composition::call_eos;
    use crate::Interfaces::eos_type::{EosInput, EosState};
    use crate::Interfaces::errors::{BurnError, IntegrationStatus};
    use crate::Networks::ignition_simple::{IC12, IgnitionSimple, IMG24, IO16};
    use crate::Networks::test_networks::{LinearDecay, PureHeating};
    use crate::settings::{BurnerSettings, CouplingKind, IntegratorKind, JacobianMode};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    /// y' = -k y
    struct Decay {
        k: f64,
    }

    impl OdeSystem for Decay {
        fn rhs(&mut self, _t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
            ydot[0] = -self.k * y[0];
            Ok(())
        }
        fn jac(&mut self, _t: f64, _y: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
            jac[(0, 0)] = -self.k;
            Ok(())
        }
        fn analytic_jacobian(&self) -> bool {
            true
        }
    }

    /// y1' = -a y1, y2' = a y1 - b y2 with b >> a
    struct StiffPair {
        a: f64,
        b: f64,
        analytic: bool,
    }

    impl StiffPair {
        fn exact(&self, t: f64) -> (f64, f64) {
            let y1 = (-self.a * t).exp();
            let y2 = self.a / (self.b - self.a) * ((-self.a * t).exp() - (-self.b * t).exp());
            (y1, y2)
        }
    }

    impl OdeSystem for StiffPair {
        fn rhs(&mut self, _t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
            ydot[0] = -self.a * y[0];
            ydot[1] = self.a * y[0] - self.b * y[1];
            Ok(())
        }
        fn jac(&mut self, _t: f64, _y: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
            jac[(0, 0)] = -self.a;
            jac[(0, 1)] = 0.0;
            jac[(1, 0)] = self.a;
            jac[(1, 1)] = -self.b;
            Ok(())
        }
        fn analytic_jacobian(&self) -> bool {
            self.analytic
        }
    }

    struct Broken;

    impl OdeSystem for Broken {
        fn rhs(&mut self, _t: f64, _y: &DVector<f64>, _ydot: &mut DVector<f64>) -> Result<(), BurnError> {
            Err(BurnError::Network("rates unavailable".to_owned()))
        }
        fn jac(&mut self, _t: f64, _y: &DVector<f64>, _jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
            Err(BurnError::Network("rates unavailable".to_owned()))
        }
        fn analytic_jacobian(&self) -> bool {
            true
        }
    }

    fn workspace(y0: &[f64], tout: f64, rtol: f64, atol: f64, controls: VodeControls) -> DvodeWorkspace {
        let n = y0.len();
        let mut ws = DvodeWorkspace::new(n, controls);
        ws.set_tolerances(&DVector::from_element(n, rtol), &DVector::from_element(n, atol));
        ws.y.copy_from_slice(y0);
        ws.t = 0.0;
        ws.tout = tout;
        ws
    }

    #[test]
    fn test_linear_decay_accuracy() {
        let rtol = 1.0e-8;
        let tout = 5.0;
        let mut system = Decay { k: 1.0 };
        let mut ws = workspace(&[1.0], tout, rtol, 1.0e-12, VodeControls::default());
        start(&mut system, &mut ws).unwrap();
        while ws.tn < tout {
            assert!(ewset(&mut ws));
            assert_eq!(dvstep(&mut system, &mut ws), StepOutcome::Accepted);
            // the global error stays a small multiple of the local tolerance
            let exact = (-ws.tn).exp();
            assert_relative_eq!(ws.yh[(0, 0)], exact, max_relative = 100.0 * rtol);
        }
        assert!(ws.nst > 10);
        // rejected steps stay rare on a smooth problem
        assert!((ws.netf as f64) < 0.1 * ws.nst as f64, "{} of {} steps rejected", ws.netf, ws.nst);

        let mut ws = workspace(&[1.0], tout, rtol, 1.0e-12, VodeControls::default());
        let status = dvode(&mut system, &mut ws);
        assert_eq!(status, IntegrationStatus::Success);
        assert_eq!(ws.t, tout);
        assert_relative_eq!(ws.y[0], (-tout).exp(), max_relative = 100.0 * rtol);
        let stats = ws.statistics(status);
        assert!(stats.last_order >= 2);
        assert_eq!(stats.n_steps, ws.nst);
    }

    fn limited_controls(increase: f64, decrease: f64) -> VodeControls {
        let mut controls = VodeControls::default();
        controls.use_species_change_limiter = true;
        controls.increase_change_factor = increase;
        controls.decrease_change_factor = decrease;
        controls
    }

    #[test]
    fn test_species_change_limiter_bounds_growth() {
        let (increase, decrease) = (1.01, 0.99);
        let tout = 1.0;
        // y' = y
        let mut system = Decay { k: -1.0 };
        let mut ws = workspace(&[1.0], tout, 1.0e-6, 1.0e-12, limited_controls(increase, decrease));
        ws.species = 0..1;
        start(&mut system, &mut ws).unwrap();
        while ws.tn < tout {
            let before = ws.yh[(0, 0)];
            assert!(ewset(&mut ws));
            assert_eq!(dvstep(&mut system, &mut ws), StepOutcome::Accepted);
            assert!(
                ws.yh[(0, 0)] <= increase * before * (1.0 + 1.0e-12),
                "step {} grew y from {:e} to {:e}",
                ws.nst,
                before,
                ws.yh[(0, 0)]
            );
        }
        // e = 1.01^100.5, and steps that overshoot were retried
        assert!(ws.nst > 100);
        assert!(ws.ncfn > 0);

        let mut ws = workspace(&[1.0], tout, 1.0e-6, 1.0e-12, limited_controls(increase, decrease));
        ws.species = 0..1;
        assert_eq!(dvode(&mut system, &mut ws), IntegrationStatus::Success);
        assert_relative_eq!(ws.y[0], 1.0f64.exp(), max_relative = 1e-4);

        let mut free = workspace(&[1.0], tout, 1.0e-6, 1.0e-12, VodeControls::default());
        free.species = 0..1;
        assert_eq!(dvode(&mut system, &mut free), IntegrationStatus::Success);
        assert!(free.nst < ws.nst);
    }

    #[test]
    fn test_species_change_limiter_bounds_decay() {
        let decrease = 0.9;
        let mut system = Decay { k: 1.0 };
        let mut ws = workspace(&[1.0], 2.0, 1.0e-6, 1.0e-12, limited_controls(1.1, decrease));
        ws.species = 0..1;
        start(&mut system, &mut ws).unwrap();
        while ws.tn < 2.0 {
            let before = ws.yh[(0, 0)];
            assert!(ewset(&mut ws));
            assert_eq!(dvstep(&mut system, &mut ws), StepOutcome::Accepted);
            assert!(ws.yh[(0, 0)] >= decrease * before * (1.0 - 1.0e-12));
        }
        // exp(-2) = 0.9^19.0
        assert!(ws.nst >= 19);
    }

    #[test]
    fn test_stiff_pair_jacobian_modes_agree() {
        let tout = 2.0;
        let mut results = Vec::new();
        for analytic in [true, false] {
            for window in [1, 50] {
                let mut system = StiffPair {
                    a: 1.0,
                    b: 1.0e4,
                    analytic,
                };
                let mut controls = VodeControls::default();
                controls.max_steps_between_jacobian_evals = window;
                let mut ws = workspace(&[1.0, 0.0], tout, 1.0e-8, 1.0e-14, controls);
                let status = dvode(&mut system, &mut ws);
                assert_eq!(status, IntegrationStatus::Success);
                let (y1, y2) = system.exact(tout);
                assert_relative_eq!(ws.y[0], y1, max_relative = 1e-5);
                assert_relative_eq!(ws.y[1], y2, max_relative = 1e-5);
                // an explicit method would need more than b t steps
                assert!(ws.nst < 2000);
                results.push((ws.y.clone(), ws.nje, window));
            }
        }
        let (y_ref, _, _) = &results[0];
        for (y, _, _) in &results[1..] {
            assert_relative_eq!(y[0], y_ref[0], max_relative = 1e-5);
            assert_relative_eq!(y[1], y_ref[1], max_relative = 1e-5);
        }
        // refreshing every step evaluates at least as many Jacobians as re-using them
        assert!(results[0].1 >= results[1].1);
        assert!(results[2].1 >= results[3].1);
    }

    #[test]
    fn test_zero_interval() {
        let mut system = Decay { k: 1.0 };
        let mut ws = workspace(&[1.0], 0.0, 1.0e-8, 1.0e-12, VodeControls::default());
        assert_eq!(dvode(&mut system, &mut ws), IntegrationStatus::Success);
        assert_eq!(ws.y[0], 1.0);
        assert_eq!(ws.nfe, 0);
    }

    #[test]
    fn test_step_budget() {
        let mut system = Decay { k: 1.0 };
        let mut controls = VodeControls::default();
        controls.max_steps = 3;
        let mut ws = workspace(&[1.0], 100.0, 1.0e-10, 1.0e-14, controls);
        let status = dvode(&mut system, &mut ws);
        assert_eq!(status, IntegrationStatus::TooManySteps);
        assert_eq!(ws.nst, 3);
        assert!(ws.t < 100.0);
        assert_eq!(ws.t, ws.tn);
        assert_relative_eq!(ws.y[0], (-ws.t).exp(), max_relative = 1e-6);
    }

    #[test]
    fn test_initial_closure_failure() {
        let mut ws = workspace(&[1.0], 1.0, 1.0e-8, 1.0e-12, VodeControls::default());
        assert_eq!(dvode(&mut Broken, &mut ws), IntegrationStatus::ClosureFailure);
    }

    #[test]
    fn test_bad_error_weight() {
        let mut system = Decay { k: 1.0 };
        let mut ws = workspace(&[0.0], 1.0, 1.0e-8, 0.0, VodeControls::default());
        assert_eq!(dvode(&mut system, &mut ws), IntegrationStatus::BadErrorWeight);
    }

    fn carbon_state() -> BurnState {
        BurnState::new(1.0e8, 1.5e9, vec![0.5, 0.5, 0.0], 0)
    }

    #[test]
    fn test_strang_zero_dt_leaves_state_unchanged() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let mut state = carbon_state();
        let before = state.clone();
        let stats = integrator(&net, &eos, &settings, &mut state, 0.0).unwrap();
        assert!(state.success);
        assert_eq!(stats.n_rhs, 0);
        assert_eq!(state.T, before.T);
        assert_eq!(state.xn, before.xn);
        assert_eq!(state.e_nuc, 0.0);
    }

    #[test]
    fn test_strang_carbon_burn() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let mut state = carbon_state();
        let stats = integrator(&net, &eos, &settings, &mut state, 1.0e-2).unwrap();
        assert!(state.success, "status {:?}", state.status);
        assert_eq!(stats.status, Some(IntegrationStatus::Success));
        assert_relative_eq!(state.time, 1.0e-2);
        assert!(state.n_rhs > 0 && state.n_jac > 0);

        // carbon turns into magnesium, oxygen is inert
        let burned = 0.5 - state.xn[IC12];
        assert!(burned > 0.0);
        assert_relative_eq!(state.xn[IMG24], burned, max_relative = 1e-6);
        assert_relative_eq!(state.xn[IO16], 0.5, max_relative = 1e-8);
        assert!(state.xn.iter().all(|x| *x >= 0.0));

        // energy release matches the change of binding energy
        let bion = [92.16294, 127.62093, 198.2579];
        let released = ENUC_CONV * burned * (bion[IMG24] / 24.0 - bion[IC12] / 12.0);
        assert_relative_eq!(state.e_nuc, released, max_relative = 1e-5);
        assert!(state.T > 1.5e9);
    }

    #[test]
    fn test_strang_numerical_jacobian_agrees() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let analytic = BurnerSettings::default();
        let numerical = BurnerSettings::default().with_jacobian(JacobianMode::Numerical);
        let mut a = carbon_state();
        let mut n = carbon_state();
        integrator(&net, &eos, &analytic, &mut a, 1.0e-2).unwrap();
        integrator(&net, &eos, &numerical, &mut n, 1.0e-2).unwrap();
        assert!(a.success && n.success);
        assert_relative_eq!(a.T, n.T, max_relative = 1e-5);
        assert_relative_eq!(a.xn[IC12], n.xn[IC12], max_relative = 1e-5);
        assert_relative_eq!(a.e_nuc, n.e_nuc, max_relative = 1e-4);
    }

    #[test]
    fn test_strang_pure_heating_bookkeeping() {
        let net = PureHeating::new(1.0e15);
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let mut state = BurnState::new(1.0e6, 1.0e8, vec![1.0], 0);
        let mut system = StrangSystem::new(&net, &eos, &settings, &mut state);
        let stats = actual_integrator(&mut system, 1.0e-2);
        assert_eq!(stats.status, Some(IntegrationStatus::Success));
        assert!(state.success);
        assert_relative_eq!(state.e_nuc, 1.0e13, max_relative = 1e-8);
        assert_relative_eq!(state.T, 1.0e8 + 1.0e13 / state.cv, max_relative = 1e-8);
    }

    #[test]
    fn test_strang_linear_decay_closed_form() {
        let (k, q, dt) = (10.0, 1.0, 0.1);
        let net = LinearDecay::new(k, q);
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let mut state = BurnState::new(1.0e6, 1.0e8, vec![1.0, 0.0], 0);
        let stats = integrator(&net, &eos, &settings, &mut state, dt).unwrap();
        assert!(state.success, "status {:?}", state.status);
        assert_eq!(stats.status, Some(IntegrationStatus::Success));

        let parent = (-k * dt).exp();
        assert_relative_eq!(state.xn[0], parent, epsilon = 1e-6);
        assert_relative_eq!(state.xn[1], 1.0 - parent, epsilon = 1e-6);
        // q MeV per decay of a nucleus with A = 4
        let released = ENUC_CONV * q * (1.0 - parent) / 4.0;
        assert_relative_eq!(state.e_nuc, released, max_relative = 1e-5);
        assert!(state.T > 1.0e8);
    }

    #[test]
    fn test_strang_species_limiter_burn() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let free = BurnerSettings::default();
        let mut limited = BurnerSettings::default();
        limited.use_species_change_limiter = true;
        let mut a = carbon_state();
        let mut b = carbon_state();
        integrator(&net, &eos, &free, &mut a, 1.0e-2).unwrap();
        integrator(&net, &eos, &limited, &mut b, 1.0e-2).unwrap();
        assert!(a.success && b.success, "status {:?}", b.status);
        assert_relative_eq!(a.xn[IC12], b.xn[IC12], max_relative = 1e-5);
        assert_relative_eq!(a.e_nuc, b.e_nuc, max_relative = 1e-4);
    }

    #[test]
    fn test_strang_without_self_heating_keeps_temperature() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default().with_self_heat(false);
        let mut state = carbon_state();
        integrator(&net, &eos, &settings, &mut state, 1.0e-2).unwrap();
        assert!(state.success);
        assert_relative_eq!(state.T, 1.5e9, max_relative = 1e-12);
        assert!(state.e_nuc > 0.0);
    }

    #[test]
    fn test_step_budget_marks_failure() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default().with_max_steps(2);
        let mut state = carbon_state();
        let xn_in = state.xn.clone();
        let stats = integrator(&net, &eos, &settings, &mut state, 1.0e-2).unwrap();
        assert!(!state.success);
        assert_eq!(state.status, IntegrationStatus::TooManySteps);
        assert_eq!(stats.status, Some(IntegrationStatus::TooManySteps));
        assert_eq!(state.xn, xn_in);
    }

    fn sdc_energy_state(net: &IgnitionSimple, eos: &GammaLaw, drho_dt: f64) -> BurnState {
        let xn = [0.5, 0.5, 0.0];
        let (rho, T) = (1.0e8, 1.5e9);
        let mut eos_state = EosState::new(3, 0);
        eos_state.rho = rho;
        eos_state.T = T;
        eos_state.xn.copy_from_slice(&xn);
        call_eos(net, eos, EosInput::RT, &mut eos_state).unwrap();
        let data = SdcData::energy_from_primitive(rho, &xn, eos_state.e, [1.0e7, 0.0, 0.0]);
        let layout = data.layout;
        // density and partial densities advected together
        let mut ydot_a = DVector::zeros(layout.nvar());
        if let Some(srho) = layout.srho() {
            ydot_a[srho] = drho_dt;
        }
        for (n, x) in xn.iter().enumerate() {
            ydot_a[layout.sfs() + n] = x * drho_dt;
        }
        BurnState::new(rho, T, xn.to_vec(), 0).with_sdc(data.with_advective_sources(ydot_a))
    }

    fn sdc_settings() -> BurnerSettings {
        BurnerSettings::default()
            .with_coupling(CouplingKind::SimplifiedSdc)
            .with_sdc_evolve(SdcEvolve::Energy)
    }

    #[test]
    fn test_sdc_zero_dt_leaves_state_unchanged() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = sdc_settings();
        let mut state = sdc_energy_state(&net, &eos, 0.0);
        let y_in = state.sdc.as_ref().map(|d| d.y.clone());
        let stats = integrator(&net, &eos, &settings, &mut state, 0.0).unwrap();
        assert!(state.success);
        assert_eq!(stats.n_steps, 0);
        assert_eq!(state.sdc.as_ref().map(|d| d.y.clone()), y_in);
        assert_eq!(state.T, 1.5e9);
    }

    #[test]
    fn test_sdc_burn_conserves_mass() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = sdc_settings();
        let mut state = sdc_energy_state(&net, &eos, 0.0);
        let e_in = state.sdc.as_ref().map(|d| (d.y[0], d.y[1])).unwrap();
        let mut coupling = Coupling::new(&net, &eos, &settings, &mut state, 1.0e-2).unwrap();
        assert_eq!(coupling.kind(), CouplingKind::SimplifiedSdc);
        let stats = coupling.integrate(1.0e-2);
        assert_eq!(stats.status, Some(IntegrationStatus::Success));
        assert!(state.success, "status {:?}", state.status);

        let data = state.sdc.as_ref().unwrap();
        let sfs = data.layout.sfs();
        let total: f64 = (0..3).map(|n| data.y[sfs + n]).sum();
        assert_relative_eq!(total, 1.0e8, max_relative = 1e-10);
        assert_relative_eq!(state.xn.sum(), 1.0, epsilon = 1e-12);
        assert!(state.xn[IC12] < 0.5);
        assert!(state.e_nuc > 0.0);
        // rho E and rho e receive the same release
        assert_relative_eq!(data.y[0] - e_in.0, data.y[1] - e_in.1, max_relative = 1e-8);
        assert_relative_eq!(state.e_nuc, (data.y[1] - e_in.1) / 1.0e8, max_relative = 1e-12);
        assert!(state.T > 1.5e9);
    }

    #[test]
    fn test_sdc_matches_strang_without_advection() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let mut sdc_state = sdc_energy_state(&net, &eos, 0.0);
        integrator(&net, &eos, &sdc_settings(), &mut sdc_state, 1.0e-2).unwrap();
        let mut strang_state = carbon_state();
        integrator(&net, &eos, &BurnerSettings::default(), &mut strang_state, 1.0e-2).unwrap();
        assert!(sdc_state.success && strang_state.success);
        assert_relative_eq!(sdc_state.xn[IC12], strang_state.xn[IC12], max_relative = 1e-4);
        assert_relative_eq!(sdc_state.e_nuc, strang_state.e_nuc, max_relative = 1e-3);
    }

    #[test]
    fn test_sdc_follows_advected_density() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = sdc_settings();
        let dt = 1.0e-3;
        let mut state = sdc_energy_state(&net, &eos, 1.0e10);
        integrator(&net, &eos, &settings, &mut state, dt).unwrap();
        assert!(state.success, "status {:?}", state.status);
        let rho_final = 1.0e8 + 1.0e10 * dt;
        assert_relative_eq!(state.rho, rho_final, max_relative = 1e-12);
        let data = state.sdc.as_ref().unwrap();
        let sfs = data.layout.sfs();
        let total: f64 = (0..3).map(|n| data.y[sfs + n]).sum();
        assert_relative_eq!(total, rho_final, max_relative = 1e-10);
    }

    #[test]
    fn test_sdc_needs_conserved_data() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let mut state = carbon_state();
        let result = integrator(&net, &eos, &sdc_settings(), &mut state, 1.0e-2);
        assert!(matches!(result, Err(BurnError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_forward_euler_rejects_sdc() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = sdc_settings().with_integrator(IntegratorKind::ForwardEuler);
        let mut state = sdc_energy_state(&net, &eos, 0.0);
        assert!(integrator(&net, &eos, &settings, &mut state, 1.0e-2).is_err());
    }

    #[test]
    fn test_coupling_layer_species_slots() {
        let net = IgnitionSimple::new();
        let eos = GammaLaw::default();
        let settings = BurnerSettings::default();
        let mut state = carbon_state();
        let system = StrangSystem::new(&net, &eos, &settings, &mut state);
        assert_eq!(system.species_range(), 0..3);
        assert_eq!(system.neq(), 5);
    }
}
