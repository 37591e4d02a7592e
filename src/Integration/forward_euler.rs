//! # Forward Euler integrator
//!
//! Explicit fallback for operator-split burns. Each substep evaluates the right-hand side once,
//! picks a substep that changes no mass fraction above `atol_spec`, no temperature and no energy
//! by more than `maximum_timestep_change_factor`, advances every equation and cleans the result
//! (mass fractions renormalized, temperature clamped into `[T_min, max_temp]`).
//!
//! The thermodynamics are evaluated once at the start; between substeps only the composition
//! means follow the mass fractions, unless the `dT_crit` policy forces an EOS call.
use crate::Integration::coupling::CouplingLayer;
use crate::Integration::dvode::OdeSystem;
use crate::Integration::strang::StrangSystem;
use crate::Integration::vode_type::VodeStatistics;
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::eos_type::Eos;
use crate::Interfaces::errors::IntegrationStatus;
use crate::Interfaces::network::{Network, net_ienuc, net_itemp, neqs};
use crate::settings::BurnerSettings;
use log::{error, info};
use nalgebra::DVector;

/// relative margin on the end time, guards against roundoff in the accumulated time
const TIMESTEP_SAFETY_FACTOR: f64 = 1.0e-12;
/// floor of |dq/dt| in the substep estimate
const SMALL_RATE: f64 = 1.0e-30;

/// largest substep that keeps `value` within the change factor at the given rate
fn change_limited_step(factor: f64, value: f64, rate: f64) -> f64 {
    let target = if rate > 0.0 {
        (factor - 1.0) * value
    } else {
        (1.0 - 1.0 / factor) * value
    };
    target / rate.abs().max(SMALL_RATE)
}

/// Substep for the integrated vector `y` with right-hand side `ydot`.
pub fn calculate_dt(
    settings: &BurnerSettings,
    self_heat: bool,
    nspec: usize,
    y: &DVector<f64>,
    ydot: &DVector<f64>,
) -> f64 {
    let factor = settings.maximum_timestep_change_factor;
    let mut dt = 1.0e200_f64;
    for n in 0..nspec {
        if y[n] >= settings.atol_spec {
            dt = dt.min(change_limited_step(factor, y[n], ydot[n]));
        }
    }
    if self_heat {
        let itemp = net_itemp(nspec);
        dt = dt.min(change_limited_step(factor, y[itemp], ydot[itemp]));
    }
    let ienuc = net_ienuc(nspec);
    if y[ienuc] != 0.0 {
        dt = dt.min(change_limited_step(factor, y[ienuc].abs(), ydot[ienuc]));
    }
    dt.min(settings.ode_max_dt)
}

/// Integrate `state` over `dt` with forward differencing and adaptive substeps.
pub fn forward_euler<N: Network + ?Sized, E: Eos + ?Sized>(
    network: &N,
    eos: &E,
    settings: &BurnerSettings,
    state: &mut BurnState,
    dt: f64,
) -> VodeStatistics {
    let start_T = state.T;
    let start_xn = state.xn.clone();
    let nspec = state.nspec();
    let neq = neqs(nspec);
    let mut system = StrangSystem::new(network, eos, settings, state).without_eos_in_rhs();

    let mut y = DVector::zeros(neq);
    let mut ydot = DVector::zeros(neq);
    let mut t = 0.0;
    let mut dt_sub = 0.0;
    let mut n_steps = 0;
    let mut n_rhs = 0;

    let mut status = IntegrationStatus::Success;
    if dt > 0.0 {
        match system.pack(&mut y) {
            Ok(()) => {
                system.clean(&mut y);
                normalize(&mut y, nspec);
            }
            Err(e) => {
                error!("initial EOS call failed: {}", e);
                status = IntegrationStatus::ClosureFailure;
            }
        }
    }
    let self_heat = system.state().self_heat;

    while status == IntegrationStatus::Success
        && t < (1.0 - TIMESTEP_SAFETY_FACTOR) * dt
        && n_steps < settings.ode_max_steps
    {
        if let Err(e) = system.rhs(t, &y, &mut ydot) {
            error!("right-hand side failed at t = {:e}: {}", t, e);
            status = IntegrationStatus::ClosureFailure;
            break;
        }
        n_rhs += 1;

        dt_sub = calculate_dt(settings, self_heat, nspec, &y, &ydot);
        if t + dt_sub > dt {
            dt_sub = dt - t;
        }
        y.axpy(dt_sub, &ydot, 1.0);
        system.clean(&mut y);
        normalize(&mut y, nspec);

        t += dt_sub;
        n_steps += 1;
    }
    if status == IntegrationStatus::Success && t < (1.0 - TIMESTEP_SAFETY_FACTOR) * dt {
        status = IntegrationStatus::TooManySteps;
    }

    if status == IntegrationStatus::Success && dt > 0.0 {
        if let Err(e) = system.unpack(&y) {
            error!("unpacking the integrated state failed: {}", e);
            status = IntegrationStatus::ClosureFailure;
        }
    }

    let state = system.state_mut();
    if dt == 0.0 {
        state.e_nuc = 0.0;
    }
    state.n_rhs = n_rhs;
    state.n_jac = 0;
    state.n_step = n_steps;
    state.time = t;
    state.status = status;
    state.success = status == IntegrationStatus::Success;

    if settings.burner_verbose {
        info!(
            "integration summary: dens {:e} temp {:e} energy released {:e}, {} steps, {} rhs evaluations",
            state.rho, state.T, state.e_nuc, n_steps, n_rhs
        );
    }
    if !state.success {
        error!(
            "integration failed: {:?} at time = {:e}, dens = {:e}",
            status, t, state.rho
        );
        error!("temp start = {:e}, xn start = {:?}", start_T, start_xn.as_slice());
        error!(
            "temp current = {:e}, xn current = {:?}",
            y[net_itemp(nspec)],
            &y.as_slice()[..nspec]
        );
        error!("energy generated = {:e}", y[net_ienuc(nspec)] - system.e_in());
    }

    VodeStatistics {
        n_steps,
        n_rhs,
        last_step: dt_sub,
        last_order: 1,
        time: t,
        status: Some(status),
        ..VodeStatistics::default()
    }
}

fn normalize(y: &mut DVector<f64>, nspec: usize) {
    let sum: f64 = y.rows(0, nspec).sum();
    if sum > 0.0 {
        for n in 0..nspec {
            y[n] /= sum;
        }
    }
}
