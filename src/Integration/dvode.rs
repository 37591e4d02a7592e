//! # BDF driver
//!
//! ## Purpose
//! Integrates y' = f(t, y) from `ws.t` to `ws.tout` with the variable-order BDF method of
//! [`crate::Integration::dvstep`]. The driver checks the error weights and the requested accuracy
//! before every step, picks the initial step size, counts steps against the step budget and
//! interpolates the solution at `tout` once the history has passed it.
//!
//! ## Main Structures
//! - `OdeSystem`: the right-hand side and Jacobian of the integrated system. The coupling layers
//!   implement it over a burn state, the tests over small model problems.
//! - `dvode`: the driver. On return `ws.y` holds the solution at `ws.t` and the status tells
//!   whether `ws.t` equals `ws.tout`.
use crate::Integration::dvstep::{StepOutcome, dvstep, set_coefficients};
use crate::Integration::vode_type::{CRATE_INIT, DvodeWorkspace, ETAMX1, UROUND};
use crate::Interfaces::errors::{BurnError, IntegrationStatus};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

/// A system of first-order ODEs as seen by the BDF integrator.
pub trait OdeSystem {
    fn rhs(&mut self, t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), BurnError>;
    /// d(ydot)/dy, only called when [`OdeSystem::analytic_jacobian`] is true
    fn jac(&mut self, t: f64, y: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), BurnError>;
    /// false makes the integrator build the Jacobian from difference quotients of `rhs`
    fn analytic_jacobian(&self) -> bool;
}

/// weighted root-mean-square norm
pub fn vnorm(v: &[f64], w: &[f64]) -> f64 {
    let n = v.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = v.iter().zip(w.iter()).map(|(a, b)| (a * b) * (a * b)).sum();
    (sum / n as f64).sqrt()
}

/// Error weights 1/(rtol |y| + atol) of the solution held in column 0 of the history.
/// Returns false when a denominator is not positive.
pub fn ewset(ws: &mut DvodeWorkspace) -> bool {
    for i in 0..ws.neq {
        let denom = ws.rtol[i] * ws.yh[(i, 0)].abs() + ws.atol[i];
        if !(denom > 0.0) {
            return false;
        }
        ws.ewt[i] = 1.0 / denom;
    }
    true
}

/// Initial step size from an estimate of the second derivative. Expects `ws.savf` = f(t, y)
/// and the error weights of the initial state.
pub fn initial_step<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> Result<f64, BurnError> {
    let t0 = ws.t;
    let tout = ws.tout;
    let tdist = (tout - t0).abs();
    let tround = UROUND * t0.abs().max(tout.abs());
    let sign = if tout >= t0 { 1.0 } else { -1.0 };

    let hlb = 100.0 * tround;
    let mut hub = 0.1 * tdist;
    for i in 0..ws.neq {
        let dely = 0.1 * ws.y[i].abs() + ws.atol[i];
        let af = ws.savf[i].abs();
        if af * hub > dely {
            hub = dely / af;
        }
    }

    let mut hg = (hlb * hub).sqrt();
    if hub < hlb {
        return Ok(sign * hg);
    }

    let mut iter = 0;
    let hnew = loop {
        let h = sign * hg;
        for i in 0..ws.neq {
            ws.acor[i] = ws.y[i] + h * ws.savf[i];
        }
        system.rhs(t0 + h, &ws.acor, &mut ws.ftem)?;
        ws.nfe += 1;
        for i in 0..ws.neq {
            ws.ftem[i] = (ws.ftem[i] - ws.savf[i]) / h;
        }
        let yddnrm = vnorm(ws.ftem.as_slice(), ws.ewt.as_slice());
        let hnew = if yddnrm * hub * hub > 2.0 {
            (2.0 / yddnrm).sqrt()
        } else {
            (hg * hub).sqrt()
        };
        iter += 1;
        if iter >= 4 {
            break hnew;
        }
        let hrat = hnew / hg;
        if hrat > 0.5 && hrat < 2.0 {
            break hnew;
        }
        if iter >= 2 && hnew > 2.0 * hg {
            break hg;
        }
        hg = hnew;
    };
    ws.acor.fill(0.0);

    let h0 = (0.5 * hnew).clamp(hlb, hub);
    Ok(sign * h0)
}

/// Solution at `tout` from the Nordsieck history: y = sum_j yh_j s^j with s = (tout - tn)/h.
pub fn interpolate(ws: &mut DvodeWorkspace, tout: f64) {
    let s = (tout - ws.tn) / ws.h;
    let nq = ws.nq;
    for i in 0..ws.neq {
        let mut v = ws.yh[(i, nq)];
        for j in (0..nq).rev() {
            v = ws.yh[(i, j)] + s * v;
        }
        ws.y[i] = v;
    }
}

fn fail_at_tn(ws: &mut DvodeWorkspace, status: IntegrationStatus) -> IntegrationStatus {
    ws.y.copy_from(&ws.yh.column(0));
    ws.t = ws.tn;
    status
}

/// Load `ws.y` as the history at `ws.t` and set up the first order-1 step.
pub fn start<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> Result<(), IntegrationStatus> {
    ws.tn = ws.t;
    ws.yh.column_mut(0).copy_from(&ws.y);
    if !ewset(ws) {
        return Err(IntegrationStatus::BadErrorWeight);
    }
    if let Err(e) = system.rhs(ws.t, &ws.y, &mut ws.savf) {
        warn!("right-hand side failed at the initial state: {}", e);
        return Err(IntegrationStatus::ClosureFailure);
    }
    ws.nfe += 1;

    let mut h0 = match initial_step(system, ws) {
        Ok(h) => h,
        Err(e) => {
            warn!("right-hand side failed while choosing the initial step: {}", e);
            return Err(IntegrationStatus::ClosureFailure);
        }
    };
    let rh = h0.abs() * ws.hmxi;
    if rh > 1.0 {
        h0 /= rh;
    }
    ws.h = h0;
    for i in 0..ws.neq {
        ws.yh[(i, 1)] = h0 * ws.savf[i];
    }

    // order 1 start
    ws.nq = 1;
    ws.l = 2;
    ws.ialth = 2;
    ws.rmax = ETAMX1;
    ws.rc = 0.0;
    ws.el0 = 1.0;
    ws.crate_ = CRATE_INIT;
    ws.hold = h0;
    ws.nslp = 0;
    ws.nslj = 0;
    ws.ipup = true;
    set_coefficients(ws);
    Ok(())
}

/// Integrate from `ws.t` to `ws.tout` starting from `ws.y`.
pub fn dvode<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> IntegrationStatus {
    let t0 = ws.t;
    let tout = ws.tout;
    if tout == t0 {
        return IntegrationStatus::Success;
    }
    let tround = UROUND * t0.abs().max(tout.abs());
    if (tout - t0).abs() < 2.0 * tround {
        debug!("interval [{}, {}] is below the time resolution, nothing to integrate", t0, tout);
        ws.t = tout;
        return IntegrationStatus::Success;
    }

    if let Err(status) = start(system, ws) {
        return status;
    }

    loop {
        if (ws.tn - tout) * ws.h >= 0.0 {
            interpolate(ws, tout);
            ws.t = tout;
            return IntegrationStatus::Success;
        }
        if ws.nst >= ws.controls.max_steps {
            debug!("step budget of {} exhausted at t = {}", ws.controls.max_steps, ws.tn);
            return fail_at_tn(ws, IntegrationStatus::TooManySteps);
        }
        if !ewset(ws) {
            return fail_at_tn(ws, IntegrationStatus::BadErrorWeight);
        }
        let tolsf = UROUND * vnorm(&ws.yh.as_slice()[..ws.neq], ws.ewt.as_slice());
        if tolsf > 1.0 {
            return fail_at_tn(ws, IntegrationStatus::ExcessAccuracyRequested);
        }
        if ws.tn + ws.h == ws.tn {
            debug!("t + h = t on the next step, t = {:e}, h = {:e}", ws.tn, ws.h);
        }

        match dvstep(system, ws) {
            StepOutcome::Accepted => {}
            StepOutcome::ErrorTestFailures => {
                return fail_at_tn(ws, IntegrationStatus::ErrorTestFailures);
            }
            StepOutcome::ConvergenceFailures => {
                return fail_at_tn(ws, IntegrationStatus::ConvergenceFailures);
            }
        }
    }
}
