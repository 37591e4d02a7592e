//! # Temperature equation
//!
//! For a self-heating burn the temperature follows the released energy,
//!
//! dT/dt = e_nuc_dot / c,
//!
//! with c = c_v for a constant-volume burn and c = c_p otherwise. Between EOS calls the specific
//! heat is extrapolated linearly from the last EOS temperature when the `dT_crit` policy is on.
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::network::{net_ienuc, net_itemp, neqs};
use crate::settings::BurnerSettings;
use nalgebra::{DMatrix, DVector};

/// specific heat used by the temperature equation
pub fn effective_specific_heat(state: &BurnState, settings: &BurnerSettings) -> f64 {
    let lazy_eos = settings.dT_crit < 1.0e19;
    if settings.do_constant_volume_burn {
        if lazy_eos {
            state.cv + (state.T - state.T_old) * state.dcvdT
        } else {
            state.cv
        }
    } else if lazy_eos {
        state.cp + (state.T - state.T_old) * state.dcpdT
    } else {
        state.cp
    }
}

/// fill the temperature slot of a network-layout right-hand side
pub fn temperature_rhs(state: &BurnState, settings: &BurnerSettings, ydot: &mut DVector<f64>) {
    let nspec = state.nspec();
    ydot[net_itemp(nspec)] = if state.self_heat {
        ydot[net_ienuc(nspec)] / effective_specific_heat(state, settings)
    } else {
        0.0
    };
}

/// fill the temperature row of a network-layout Jacobian
pub fn temperature_jac(state: &BurnState, settings: &BurnerSettings, jac: &mut DMatrix<f64>) {
    let nspec = state.nspec();
    let itemp = net_itemp(nspec);
    let ienuc = net_ienuc(nspec);
    if state.self_heat {
        let c = effective_specific_heat(state, settings);
        for j in 0..neqs(nspec) {
            jac[(itemp, j)] = jac[(ienuc, j)] / c;
        }
    } else {
        for j in 0..neqs(nspec) {
            jac[(itemp, j)] = 0.0;
        }
    }
}
