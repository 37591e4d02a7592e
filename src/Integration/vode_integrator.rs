//! # BDF burn driver
//!
//! Runs one burn of a coupling layer through the BDF integrator: tolerances and limits from the
//! settings, packing, integration from 0 to `dt`, the plausibility checks on the converged
//! vector and unpacking. The outcome is recorded on the burn state (`success`, `status`,
//! counters) and returned as [`VodeStatistics`].
use crate::Integration::coupling::CouplingLayer;
use crate::Integration::dvode::dvode;
use crate::Integration::vode_type::{DvodeWorkspace, VodeControls, VodeStatistics};
use crate::Interfaces::errors::IntegrationStatus;
use log::{error, info};

/// Integrate the state behind `system` over `dt`.
pub fn actual_integrator<C: CouplingLayer>(system: &mut C, dt: f64) -> VodeStatistics {
    if dt == 0.0 {
        let state = system.state_mut();
        state.e_nuc = 0.0;
        state.time = 0.0;
        state.success = true;
        state.status = IntegrationStatus::Success;
        return VodeStatistics {
            status: Some(IntegrationStatus::Success),
            ..VodeStatistics::default()
        };
    }

    let neq = system.neq();
    let verbose = system.settings().burner_verbose;
    let mut ws = DvodeWorkspace::new(neq, VodeControls::from_settings(system.settings()));
    system.tolerances(&mut ws.rtol, &mut ws.atol);
    ws.species = system.species_range();
    ws.t = 0.0;
    ws.tout = dt;

    let start_T = system.state().T;
    let start_xn = system.state().xn.clone();

    let mut status = match system.pack(&mut ws.y) {
        Ok(()) => dvode(system, &mut ws),
        Err(e) => {
            error!("setting up the burn failed: {}", e);
            IntegrationStatus::ClosureFailure
        }
    };

    if status.solver_succeeded() {
        if !system.plausible(&ws.y) {
            status = IntegrationStatus::PlausibilityViolation;
        } else if let Err(e) = system.unpack(&ws.y) {
            error!("unpacking the integrated state failed: {}", e);
            status = IntegrationStatus::ClosureFailure;
        }
    }

    let state = system.state_mut();
    state.n_rhs = ws.nfe;
    state.n_jac = ws.nje;
    state.n_step = ws.nst;
    state.time = ws.t;
    state.status = status;
    state.success = status == IntegrationStatus::Success;

    if verbose {
        info!(
            "integration summary: dens {:e} temp {:e} energy released {:e}, {} steps, {} rhs evaluations, {} jacobians",
            state.rho, state.T, state.e_nuc, ws.nst, ws.nfe, ws.nje
        );
    }
    if !state.success {
        error!(
            "integration failed: {:?} (istate = {}) at time = {:e}, dens = {:e}",
            status,
            status.istate(),
            ws.t,
            state.rho
        );
        error!("temp start = {:e}, xn start = {:?}", start_T, start_xn.as_slice());
        error!(
            "integrated vector at failure = {:?}",
            &ws.y.as_slice()[..neq]
        );
        error!("energy generated = {:e}", state.e_nuc);
    }
    ws.statistics(status)
}
