//! # Finite-difference network Jacobian
//!
//! d(ydot)/dy for y = (X, T, e) in the network layout, with the species expressed in mass
//! fractions (the right-hand side returned by the network is in dY/dt and is converted). The
//! increment is h = eps |y_j|, or eps itself when y_j is zero, with eps = 1e-8. Derivatives
//! with respect to the energy are zero.
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::{Network, net_ienuc, neqs, ydot_y_to_x};
use nalgebra::{DMatrix, DVector};

pub const JAC_EPS: f64 = 1.0e-8;

/// buffers of the difference quotients, allocated once per integration
#[derive(Debug, Clone)]
pub struct JacobianScratch {
    perturbed: BurnState,
    ydotp: DVector<f64>,
    ydotm: DVector<f64>,
}

impl JacobianScratch {
    pub fn new(state: &BurnState) -> Self {
        let neq = neqs(state.nspec());
        Self {
            perturbed: state.clone(),
            ydotp: DVector::zeros(neq),
            ydotm: DVector::zeros(neq),
        }
    }
}

fn increment(value: f64) -> f64 {
    let h = JAC_EPS * value.abs();
    if h == 0.0 { JAC_EPS } else { h }
}

/// Fill `jac` with the one-sided (or centered) difference Jacobian of `network` at `state`.
pub fn numerical_jac<N: Network + ?Sized>(
    network: &N,
    state: &BurnState,
    centered: bool,
    scratch: &mut JacobianScratch,
    jac: &mut DMatrix<f64>,
) -> Result<(), BurnError> {
    let nspec = state.nspec();
    let aion = network.aion();
    let neq = neqs(nspec);
    jac.fill(0.0);

    let JacobianScratch {
        perturbed,
        ydotp,
        ydotm,
    } = scratch;
    perturbed.clone_from(state);

    if !centered {
        network.actual_rhs(state, ydotm)?;
        ydot_y_to_x(aion, ydotm);
    }

    // columns 0..nspec are the species, column nspec the temperature
    for j in 0..=nspec {
        let base = if j < nspec { state.xn[j] } else { state.T };
        let h = increment(base);

        set_variable(perturbed, j, nspec, base + h);
        network.actual_rhs(perturbed, ydotp)?;
        ydot_y_to_x(aion, ydotp);

        if centered {
            set_variable(perturbed, j, nspec, base - h);
            network.actual_rhs(perturbed, ydotm)?;
            ydot_y_to_x(aion, ydotm);
            for m in 0..neq {
                jac[(m, j)] = 0.5 * (ydotp[m] - ydotm[m]) / h;
            }
        } else {
            for m in 0..neq {
                jac[(m, j)] = (ydotp[m] - ydotm[m]) / h;
            }
        }
        set_variable(perturbed, j, nspec, base);
    }
    for m in 0..neq {
        jac[(m, net_ienuc(nspec))] = 0.0;
    }
    Ok(())
}

fn set_variable(state: &mut BurnState, j: usize, nspec: usize, value: f64) {
    if j < nspec {
        state.xn[j] = value;
    } else {
        state.T = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interfaces::network::jac_y_to_x;
    use crate::Networks::ignition_simple::IgnitionSimple;
    use crate::Networks::test_networks::LinearDecay;
    use approx::assert_relative_eq;

    fn analytic_in_x<N: Network>(net: &N, state: &BurnState) -> DMatrix<f64> {
        let neq = neqs(state.nspec());
        let mut jac = DMatrix::zeros(neq, neq);
        net.actual_jac(state, &mut jac).unwrap();
        jac_y_to_x(net.aion(), &mut jac);
        jac
    }

    #[test]
    fn test_linear_network_is_exact() {
        let net = LinearDecay::new(3.0, 1.0);
        let state = BurnState::new(1.0, 1.0e8, vec![0.7, 0.3], 0);
        let mut scratch = JacobianScratch::new(&state);
        let mut jac = DMatrix::zeros(4, 4);
        numerical_jac(&net, &state, false, &mut scratch, &mut jac).unwrap();
        let exact = analytic_in_x(&net, &state);
        assert_relative_eq!(jac[(0, 0)], exact[(0, 0)], max_relative = 1e-6);
        assert_relative_eq!(jac[(1, 0)], exact[(1, 0)], max_relative = 1e-6);
        assert_relative_eq!(jac[(3, 0)], exact[(3, 0)], max_relative = 1e-6);
        assert_eq!(jac[(0, 3)], 0.0);
    }

    #[test]
    fn test_ignition_one_sided_and_centered() {
        let net = IgnitionSimple::new();
        let state = BurnState::new(1.0e8, 2.0e9, vec![0.5, 0.5, 0.0], 0);
        let exact = analytic_in_x(&net, &state);
        let mut scratch = JacobianScratch::new(&state);
        for centered in [false, true] {
            let mut jac = DMatrix::zeros(5, 5);
            numerical_jac(&net, &state, centered, &mut scratch, &mut jac).unwrap();
            // d(Xdot_C)/dX_C and the temperature column
            assert_relative_eq!(jac[(0, 0)], exact[(0, 0)], max_relative = 1e-5);
            assert_relative_eq!(jac[(0, 3)], exact[(0, 3)], max_relative = 1e-4);
            assert_relative_eq!(jac[(4, 0)], exact[(4, 0)], max_relative = 1e-5);
        }
        // zero abundance uses an absolute increment
        let state = BurnState::new(1.0e8, 2.0e9, vec![0.0, 0.5, 0.5], 0);
        let mut jac = DMatrix::zeros(5, 5);
        numerical_jac(&net, &state, true, &mut scratch, &mut jac).unwrap();
        assert!(jac.iter().all(|v| v.is_finite()));
    }
}
