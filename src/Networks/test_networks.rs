//! Small networks with closed-form solutions, used to check the integrators.
//!
//! - `LinearDecay`: A -> B at a constant rate k, releasing q MeV per decay
//! - `PureHeating`: one inert species and a constant specific heating rate
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::{Network, enuc_from_ydot, net_ienuc, net_itemp, neqs};
use crate::Networks::rhs_terms::{
    RhsTerm, energy_jac_row, molar_abundances, species_jac, species_rhs,
};
use nalgebra::{DMatrix, DVector};

fn check_dims(state: &BurnState, nspec: usize) -> Result<(), BurnError> {
    if state.nspec() != nspec {
        return Err(BurnError::DimensionMismatch {
            expected: nspec,
            found: state.nspec(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LinearDecay {
    /// decay rate, 1/s
    pub k: f64,
    bion: [f64; 2],
    terms: Vec<RhsTerm>,
}

impl LinearDecay {
    /// `q` is the energy released per decay in MeV
    pub fn new(k: f64, q: f64) -> Self {
        Self {
            k,
            bion: [0.0, q],
            terms: vec![RhsTerm::new(0, -1.0, &[0], 0), RhsTerm::new(1, 1.0, &[0], 0)],
        }
    }
}

impl Network for LinearDecay {
    fn name(&self) -> &str {
        "linear_decay"
    }
    fn nspec(&self) -> usize {
        2
    }
    fn naux(&self) -> usize {
        0
    }
    fn aion(&self) -> &[f64] {
        &[4.0, 4.0]
    }
    fn zion(&self) -> &[f64] {
        &[2.0, 2.0]
    }
    fn bion(&self) -> &[f64] {
        &self.bion
    }
    fn species_names(&self) -> &[&'static str] {
        &["parent", "daughter"]
    }

    fn actual_rhs(&self, state: &BurnState, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        check_dims(state, 2)?;
        let mut ymol = [0.0; 2];
        molar_abundances(&state.xn, self.aion(), &mut ymol);
        species_rhs(&self.terms, &ymol, &[self.k], ydot);
        ydot[net_itemp(2)] = 0.0;
        ydot[net_ienuc(2)] = enuc_from_ydot(&self.bion, ydot);
        Ok(())
    }

    fn has_analytic_jacobian(&self) -> bool {
        true
    }

    fn actual_jac(&self, state: &BurnState, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
        check_dims(state, 2)?;
        jac.fill(0.0);
        let mut ymol = [0.0; 2];
        molar_abundances(&state.xn, self.aion(), &mut ymol);
        species_jac(&self.terms, &ymol, &[self.k], &[0.0], jac);
        energy_jac_row(&self.bion, jac);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PureHeating {
    /// specific heating rate, erg/g/s
    pub eps: f64,
}

impl PureHeating {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }
}

impl Network for PureHeating {
    fn name(&self) -> &str {
        "pure_heating"
    }
    fn nspec(&self) -> usize {
        1
    }
    fn naux(&self) -> usize {
        0
    }
    fn aion(&self) -> &[f64] {
        &[4.0]
    }
    fn zion(&self) -> &[f64] {
        &[2.0]
    }
    fn bion(&self) -> &[f64] {
        &[0.0]
    }
    fn species_names(&self) -> &[&'static str] {
        &["inert"]
    }

    fn actual_rhs(&self, state: &BurnState, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        check_dims(state, 1)?;
        ydot[0] = 0.0;
        ydot[net_itemp(1)] = 0.0;
        ydot[net_ienuc(1)] = self.eps;
        Ok(())
    }

    fn has_analytic_jacobian(&self) -> bool {
        true
    }

    fn actual_jac(&self, state: &BurnState, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
        check_dims(state, 1)?;
        if jac.nrows() != neqs(1) {
            return Err(BurnError::DimensionMismatch {
                expected: neqs(1),
                found: jac.nrows(),
            });
        }
        jac.fill(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interfaces::constants::ENUC_CONV;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_decay_rhs_and_jac() {
        let net = LinearDecay::new(2.0, 1.0);
        let state = BurnState::new(1.0, 1.0e8, vec![0.8, 0.2], 0);
        let mut ydot = DVector::zeros(4);
        net.actual_rhs(&state, &mut ydot).unwrap();
        assert_relative_eq!(ydot[0], -2.0 * 0.2);
        assert_relative_eq!(ydot[1], 2.0 * 0.2);
        assert_relative_eq!(ydot[3], 0.4 * ENUC_CONV);

        let mut jac = DMatrix::zeros(4, 4);
        net.actual_jac(&state, &mut jac).unwrap();
        assert_relative_eq!(jac[(0, 0)], -2.0);
        assert_relative_eq!(jac[(1, 0)], 2.0);
        assert_relative_eq!(jac[(3, 0)], 2.0 * ENUC_CONV);
    }

    #[test]
    fn test_pure_heating() {
        let net = PureHeating::new(1.0e15);
        let state = BurnState::new(1.0, 1.0e8, vec![1.0], 0);
        let mut ydot = DVector::zeros(3);
        net.actual_rhs(&state, &mut ydot).unwrap();
        assert_eq!(ydot[0], 0.0);
        assert_relative_eq!(ydot[2], 1.0e15);
    }
}
