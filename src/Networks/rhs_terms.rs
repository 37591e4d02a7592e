//! # Reaction-term networks
//!
//! Many networks can be written as a table of terms, one per (species, reaction) pair:
//!
//! dY_i/dt = sum_j K_ij Y_a Y_b Y_c r_j
//!
//! where K_ij is a constant prefactor (stoichiometry and identical-particle factors), Y_a, Y_b,
//! Y_c are up to three reactant abundances and r_j is the rate (density factor included). The
//! right-hand side and the analytic Jacobian in (Y, T) follow generically from the table.
use crate::Interfaces::constants::ENUC_CONV;
use crate::Interfaces::network::{net_ienuc, net_itemp};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct RhsTerm {
    /// species whose abundance this term changes
    pub species: usize,
    pub prefactor: f64,
    /// reactant species, unused slots are `None`
    pub reactants: [Option<usize>; 3],
    /// index into the rate array
    pub rate: usize,
}

impl RhsTerm {
    pub fn new(species: usize, prefactor: f64, reactants: &[usize], rate: usize) -> Self {
        let mut slots = [None; 3];
        for (slot, r) in slots.iter_mut().zip(reactants.iter()) {
            *slot = Some(*r);
        }
        Self {
            species,
            prefactor,
            reactants: slots,
            rate,
        }
    }

    /// product of the reactant abundances, skipping slot `skip`
    fn abundance_product(&self, ymol: &[f64], skip: Option<usize>) -> f64 {
        let mut prod = 1.0;
        for (k, r) in self.reactants.iter().enumerate() {
            if Some(k) == skip {
                continue;
            }
            if let Some(s) = r {
                prod *= ymol[*s];
            }
        }
        prod
    }
}

/// molar abundances Y = X/A
pub fn molar_abundances(xn: &DVector<f64>, aion: &[f64], ymol: &mut [f64]) {
    for n in 0..aion.len() {
        ymol[n] = xn[n] / aion[n];
    }
}

/// species part of the network right-hand side, dY/dt
pub fn species_rhs(terms: &[RhsTerm], ymol: &[f64], rates: &[f64], ydot: &mut DVector<f64>) {
    for n in 0..ymol.len() {
        ydot[n] = 0.0;
    }
    for term in terms {
        ydot[term.species] +=
            term.prefactor * term.abundance_product(ymol, None) * rates[term.rate];
    }
}

/// species rows of the network Jacobian: d(dY/dt)/dY and d(dY/dt)/dT
pub fn species_jac(
    terms: &[RhsTerm],
    ymol: &[f64],
    rates: &[f64],
    drates_dT: &[f64],
    jac: &mut DMatrix<f64>,
) {
    let nspec = ymol.len();
    let itemp = net_itemp(nspec);
    for term in terms {
        let i = term.species;
        for (k, r) in term.reactants.iter().enumerate() {
            if let Some(s) = r {
                jac[(i, *s)] +=
                    term.prefactor * term.abundance_product(ymol, Some(k)) * rates[term.rate];
            }
        }
        jac[(i, itemp)] +=
            term.prefactor * term.abundance_product(ymol, None) * drates_dT[term.rate];
    }
}

/// Energy row of the network Jacobian from its species rows: e_nuc_dot = sum_n ydot_n B_n.
pub fn energy_jac_row(bion: &[f64], jac: &mut DMatrix<f64>) {
    let nspec = bion.len();
    let ienuc = net_ienuc(nspec);
    for m in 0..jac.ncols() {
        let mut sum = 0.0;
        for n in 0..nspec {
            sum += jac[(n, m)] * bion[n];
        }
        jac[(ienuc, m)] = sum * ENUC_CONV;
    }
}
