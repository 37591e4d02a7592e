//! # One BDF step
//!
//! ## Purpose
//! Advances the Nordsieck history by one accepted step of size `h`, retrying internally with
//! smaller steps (and lower order) after corrector convergence failures or local error test
//! failures.
//!
//! ## Algorithm
//! 1. predict: multiply the history by the Pascal triangle matrix
//! 2. correct: modified Newton iteration on h f(y) - yh_1 - acor = 0 with the iteration matrix
//!    P = I - h l0 J. The Jacobian is cached and re-used across steps; P is re-formed when the
//!    coefficient h l0 has drifted or after `MSBP` steps.
//! 3. error test on the weighted norm of the correction
//! 4. on acceptance: update the history and, every nq + 1 steps, choose the order among
//!    nq - 1, nq and nq + 1 that allows the largest next step
use crate::Integration::dvode::{OdeSystem, vnorm};
use crate::Integration::linear_algebra::{SingularMatrix, lu_factor, lu_solve};
use crate::Integration::vode_type::{
    CCMAX, CCMXJ, CRATE_INIT, DvodeWorkspace, ETAMX2, ETAMX3, HMIN, MAXCOR, MSBP, MXNCF, MXNEF,
    THRESH, UROUND, VODE_LMAX, bdf_coefficients,
};
use crate::Interfaces::errors::BurnError;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    /// MXNEF consecutive local error test failures, or h at its lower limit
    ErrorTestFailures,
    /// MXNCF corrector convergence failures, or h at its lower limit
    ConvergenceFailures,
}

#[derive(Debug)]
enum CorrectorFailure {
    Closure(BurnError),
    Singular(SingularMatrix),
    NotConverged,
    SpeciesChange(usize),
}

/// Load the coefficients of order `ws.nq` and rescale `rc` to the new leading coefficient.
pub fn set_coefficients(ws: &mut DvodeWorkspace) {
    let (el, tesco) = bdf_coefficients(ws.nq);
    ws.el = el;
    ws.tesco = tesco;
    ws.rc *= el[0] / ws.el0;
    ws.el0 = el[0];
    ws.conit = 0.5 / (ws.nq + 2) as f64;
}

/// Pascal triangle update of the history, advancing it by one step.
fn predict(ws: &mut DvodeWorkspace) {
    let nq = ws.nq;
    for k in 0..nq {
        for j in (k..nq).rev() {
            for i in 0..ws.neq {
                let v = ws.yh[(i, j + 1)];
                ws.yh[(i, j)] += v;
            }
        }
    }
}

/// Inverse of [`predict`].
fn retract(ws: &mut DvodeWorkspace) {
    let nq = ws.nq;
    for k in 0..nq {
        for j in (k..nq).rev() {
            for i in 0..ws.neq {
                let v = ws.yh[(i, j + 1)];
                ws.yh[(i, j)] -= v;
            }
        }
    }
}

/// Change the step by the factor `rh`, limited by `rmax` and by the largest step.
fn rescale(ws: &mut DvodeWorkspace, rh: f64) {
    let mut rh = rh.max(HMIN / ws.h.abs());
    rh = rh.min(ws.rmax);
    rh /= (ws.h.abs() * ws.hmxi * rh).max(1.0);
    let mut r = 1.0;
    for j in 1..ws.l {
        r *= rh;
        for i in 0..ws.neq {
            ws.yh[(i, j)] *= r;
        }
    }
    ws.h *= rh;
    ws.rc *= rh;
    ws.ialth = ws.l;
}

/// Difference-quotient Jacobian around `ws.y`, with `ws.savf` = f(tn, y).
fn difference_jacobian<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> Result<(), BurnError> {
    let n = ws.neq;
    let fac = vnorm(ws.savf.as_slice(), ws.ewt.as_slice());
    let mut r0 = 1000.0 * ws.h.abs() * UROUND * n as f64 * fac;
    if r0 == 0.0 {
        r0 = 1.0;
    }
    let srur = UROUND.sqrt();
    for j in 0..n {
        let yj = ws.y[j];
        let r = (srur * yj.abs()).max(r0 / ws.ewt[j]);
        ws.y[j] += r;
        let result = system.rhs(ws.tn, &ws.y, &mut ws.ftem);
        ws.y[j] = yj;
        result?;
        for i in 0..n {
            ws.jac[(i, j)] = (ws.ftem[i] - ws.savf[i]) / r;
        }
    }
    ws.nfe += n;
    Ok(())
}

/// Evaluate or re-use the Jacobian, then form and factor P = I - h l0 J.
fn prepare_iteration_matrix<S: OdeSystem>(
    system: &mut S,
    ws: &mut DvodeWorkspace,
) -> Result<(), CorrectorFailure> {
    let refresh = ws.nst == 0
        || ws.nst > ws.nslj + ws.controls.max_steps_between_jacobian_evals
        || (ws.icf == 1 && ws.drc < CCMXJ)
        || ws.icf == 2;
    if refresh {
        ws.nje += 1;
        ws.nslj = ws.nst;
        ws.jcur = true;
        if system.analytic_jacobian() {
            system
                .jac(ws.tn, &ws.y, &mut ws.jac)
                .map_err(CorrectorFailure::Closure)?;
        } else {
            difference_jacobian(system, ws).map_err(CorrectorFailure::Closure)?;
        }
        ws.jac_save.copy_from(&ws.jac);
        debug!("Jacobian evaluated at step {}, t = {:e}", ws.nst, ws.tn);
    } else {
        ws.jcur = false;
    }

    let hl0 = ws.h * ws.el0;
    let n = ws.neq;
    for j in 0..n {
        for i in 0..n {
            ws.p[(i, j)] = -hl0 * ws.jac_save[(i, j)];
        }
        ws.p[(j, j)] += 1.0;
    }
    ws.nlu += 1;
    lu_factor(&mut ws.p, &mut ws.pivots).map_err(CorrectorFailure::Singular)
}

/// Modified Newton iteration from the predicted history. Returns the scaled norm of the
/// converged correction.
fn corrector<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> Result<f64, CorrectorFailure> {
    let n = ws.neq;
    loop {
        let mut m = 0;
        let mut delp = 0.0;
        ws.y.copy_from(&ws.yh.column(0));
        system
            .rhs(ws.tn, &ws.y, &mut ws.savf)
            .map_err(CorrectorFailure::Closure)?;
        ws.nfe += 1;
        if ws.ipup {
            prepare_iteration_matrix(system, ws)?;
            ws.ipup = false;
            ws.rc = 1.0;
            ws.drc = 0.0;
            ws.crate_ = CRATE_INIT;
            ws.nslp = ws.nst;
        }
        ws.acor.fill(0.0);

        let failure = loop {
            for i in 0..n {
                ws.ftem[i] = ws.h * ws.savf[i] - (ws.yh[(i, 1)] + ws.acor[i]);
            }
            lu_solve(&ws.p, &ws.pivots, &mut ws.ftem);
            if ws.rc != 1.0 {
                ws.ftem *= 2.0 / (1.0 + ws.rc);
            }
            let del = vnorm(ws.ftem.as_slice(), ws.ewt.as_slice());
            ws.acor += &ws.ftem;
            for i in 0..n {
                ws.y[i] = ws.yh[(i, 0)] + ws.el[0] * ws.acor[i];
            }
            if !del.is_finite() {
                break CorrectorFailure::NotConverged;
            }

            if m != 0 {
                ws.crate_ = (0.2 * ws.crate_).max(del / delp);
            }
            let dcon = del * (1.5 * ws.crate_).min(1.0) / (ws.tesco[1] * ws.conit);
            if dcon <= 1.0 {
                let acnrm = if m == 0 {
                    del
                } else {
                    vnorm(ws.acor.as_slice(), ws.ewt.as_slice())
                };
                ws.jcur = false;
                return Ok(acnrm / ws.tesco[1]);
            }

            m += 1;
            if m == MAXCOR || (m >= 2 && del > 2.0 * delp) {
                break CorrectorFailure::NotConverged;
            }
            delp = del;
            if let Err(e) = system.rhs(ws.tn, &ws.y, &mut ws.savf) {
                break CorrectorFailure::Closure(e);
            }
            ws.nfe += 1;
        };

        if ws.jcur {
            return Err(failure);
        }
        // retry with a refreshed iteration matrix
        ws.icf = 1;
        ws.ipup = true;
    }
}

/// First species whose change over the step exceeds the allowed factors.
fn species_change_violation(ws: &DvodeWorkspace) -> Option<usize> {
    let inc = ws.controls.increase_change_factor;
    let dec = ws.controls.decrease_change_factor;
    ws.species.clone().find(|&i| {
        let old = ws.y_prev[i];
        old > ws.atol[i] && (ws.y[i] > inc * old || ws.y[i] < dec * old)
    })
}

/// Largest step ratios for order nq - 1 and nq + 1 and the ratio for order nq from `dsm`;
/// returns the chosen order and ratio. `rhup` is zero when raising the order is not allowed.
fn choose_order(ws: &DvodeWorkspace, dsm: f64, rhup: f64, kflag: i32) -> (usize, f64) {
    let l = ws.l as f64;
    let rhsm = 1.0 / (1.2 * dsm.powf(1.0 / l) + 1.2e-6);
    let mut rhdn = 0.0;
    if ws.nq != 1 {
        let n = ws.neq;
        let col = &ws.yh.as_slice()[ws.nq * n..(ws.nq + 1) * n];
        let ddn = vnorm(col, ws.ewt.as_slice()) / ws.tesco[0];
        rhdn = 1.0 / (1.3 * ddn.powf(1.0 / ws.nq as f64) + 1.3e-6);
    }

    if rhsm >= rhup {
        if rhsm >= rhdn {
            return (ws.nq, rhsm);
        }
    } else if rhup > rhdn {
        return (ws.l, rhup);
    }
    let rh = if kflag < 0 && rhdn > 1.0 { 1.0 } else { rhdn };
    (ws.nq - 1, rh)
}

/// Take one step. On acceptance `ws.tn` and the history are advanced and `ws.h`, `ws.nq` hold
/// the step and order proposed for the next step. On failure the history is restored to `told`.
pub fn dvstep<S: OdeSystem>(system: &mut S, ws: &mut DvodeWorkspace) -> StepOutcome {
    let n = ws.neq;
    let told = ws.tn;
    ws.told = told;
    let mut kflag: i32 = 0;
    let mut ncf = 0;
    ws.icf = 0;
    ws.y_prev.copy_from(&ws.yh.column(0));

    loop {
        ws.drc = (ws.rc - 1.0).abs();
        if ws.drc > CCMAX || ws.nst >= ws.nslp + MSBP {
            ws.ipup = true;
        }
        ws.tn += ws.h;
        predict(ws);

        let result = corrector(system, ws).and_then(|dsm| {
            if ws.controls.use_species_change_limiter {
                if let Some(i) = species_change_violation(ws) {
                    return Err(CorrectorFailure::SpeciesChange(i));
                }
            }
            Ok(dsm)
        });

        let dsm = match result {
            Ok(dsm) => dsm,
            Err(failure) => {
                match failure {
                    CorrectorFailure::Closure(e) => {
                        debug!("corrector failed at t = {:e}, h = {:e}: {}", ws.tn, ws.h, e)
                    }
                    CorrectorFailure::Singular(SingularMatrix(k)) => debug!(
                        "iteration matrix singular at pivot {}, t = {:e}, h = {:e}",
                        k, ws.tn, ws.h
                    ),
                    CorrectorFailure::NotConverged => {
                        debug!("corrector did not converge at t = {:e}, h = {:e}", ws.tn, ws.h)
                    }
                    CorrectorFailure::SpeciesChange(i) => debug!(
                        "species {} changed from {:e} to {:e} at t = {:e}, retrying with a smaller step",
                        i, ws.y_prev[i], ws.y[i], ws.tn
                    ),
                }
                ws.icf = 2;
                ncf += 1;
                ws.ncfn += 1;
                ws.rmax = ETAMX3;
                ws.tn = told;
                retract(ws);
                if ws.h.abs() <= HMIN * 1.00001 || ncf == MXNCF {
                    ws.hold = ws.h;
                    return StepOutcome::ConvergenceFailures;
                }
                ws.ipup = true;
                rescale(ws, 0.25);
                continue;
            }
        };

        if dsm > 1.0 {
            // local error test failed
            kflag -= 1;
            ws.netf += 1;
            ws.tn = told;
            retract(ws);
            ws.rmax = ETAMX3;
            ws.ipup = true;
            if ws.h.abs() <= HMIN * 1.00001 || kflag == -(MXNEF as i32) {
                ws.hold = ws.h;
                return StepOutcome::ErrorTestFailures;
            }
            if kflag <= -3 {
                // restart at order 1 from the current solution with a tenth of the step
                let rh = 0.1f64.max(HMIN / ws.h.abs());
                ws.h *= rh;
                ws.y.copy_from(&ws.yh.column(0));
                if let Err(e) = system.rhs(ws.tn, &ws.y, &mut ws.savf) {
                    debug!("right-hand side failed during an order-1 restart: {}", e);
                    ws.hold = ws.h;
                    return StepOutcome::ConvergenceFailures;
                }
                ws.nfe += 1;
                for i in 0..n {
                    ws.yh[(i, 1)] = ws.h * ws.savf[i];
                }
                ws.ialth = 5;
                if ws.nq != 1 {
                    ws.nq = 1;
                    ws.l = 2;
                    set_coefficients(ws);
                }
                continue;
            }
            let (newq, mut rh) = choose_order(ws, dsm, 0.0, kflag);
            if kflag <= -2 {
                rh = rh.min(0.2);
            }
            if newq != ws.nq {
                ws.nq = newq;
                ws.l = newq + 1;
                set_coefficients(ws);
            }
            rescale(ws, rh);
            continue;
        }

        // accepted
        ws.nst += 1;
        ws.hu = ws.h;
        ws.nqu = ws.nq;
        let tq_step = ws.tesco[1];
        for j in 0..ws.l {
            let c = ws.el[j];
            for i in 0..n {
                ws.yh[(i, j)] += c * ws.acor[i];
            }
        }
        ws.ialth -= 1;
        if ws.ialth == 0 {
            let mut rhup = 0.0;
            if ws.l != VODE_LMAX {
                for i in 0..n {
                    ws.savf[i] = ws.acor[i] - ws.yh[(i, VODE_LMAX - 1)];
                }
                let dup = vnorm(ws.savf.as_slice(), ws.ewt.as_slice()) / ws.tesco[2];
                rhup = 1.0 / (1.4 * dup.powf(1.0 / (ws.l + 1) as f64) + 1.4e-6);
            }
            let (newq, rh) = choose_order(ws, dsm, rhup, 0);
            if rh < THRESH {
                ws.ialth = 3;
            } else {
                if newq > ws.nq {
                    // new highest-order column from the correction
                    let r = ws.el[ws.l - 1] / ws.l as f64;
                    for i in 0..n {
                        ws.yh[(i, newq)] = r * ws.acor[i];
                    }
                }
                if newq != ws.nq {
                    ws.nq = newq;
                    ws.l = newq + 1;
                    set_coefficients(ws);
                }
                rescale(ws, rh);
                ws.rmax = ETAMX2;
            }
        } else if ws.ialth == 1 && ws.l != VODE_LMAX {
            // keep the correction for the order-raise estimate of the next step
            for i in 0..n {
                ws.yh[(i, VODE_LMAX - 1)] = ws.acor[i];
            }
        }
        ws.acor /= tq_step;
        ws.hold = ws.h;
        return StepOutcome::Accepted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Integration::vode_type::VodeControls;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    #[test]
    fn test_predict_and_retract_are_inverse() {
        let mut ws = DvodeWorkspace::new(2, VodeControls::default());
        ws.nq = 3;
        ws.yh = DMatrix::from_fn(2, VODE_LMAX, |i, j| (i + 1) as f64 * (j as f64 + 0.5));
        let original = ws.yh.clone();
        predict(&mut ws);
        // y(t + h) = sum of the first nq + 1 columns
        let expected: f64 = (0..=3).map(|j| original[(0, j)]).sum();
        assert_relative_eq!(ws.yh[(0, 0)], expected, epsilon = 1e-14);
        // h y' picks up 2 yh_2 + 3 yh_3
        let expected = original[(0, 1)] + 2.0 * original[(0, 2)] + 3.0 * original[(0, 3)];
        assert_relative_eq!(ws.yh[(0, 1)], expected, epsilon = 1e-14);
        retract(&mut ws);
        for (a, b) in ws.yh.iter().zip(original.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_rescale_respects_limits() {
        let mut ws = DvodeWorkspace::new(1, VodeControls::default());
        ws.h = 1.0;
        ws.l = 3;
        ws.rc = 1.0;
        ws.rmax = 2.0;
        ws.yh[(0, 1)] = 1.0;
        ws.yh[(0, 2)] = 1.0;
        rescale(&mut ws, 5.0);
        assert_relative_eq!(ws.h, 2.0);
        assert_relative_eq!(ws.yh[(0, 1)], 2.0);
        assert_relative_eq!(ws.yh[(0, 2)], 4.0);
        assert_eq!(ws.ialth, 3);

        ws.rmax = 100.0;
        ws.hmxi = 1.0 / 3.0;
        rescale(&mut ws, 10.0);
        assert_relative_eq!(ws.h, 3.0, epsilon = 1e-14);
    }
}
