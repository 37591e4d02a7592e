//! # Strang coupling
//!
//! ## Purpose
//! Operator-split burning at constant density: the integrated vector is
//! `[X_1..X_N, T, e]` in the network layout. Species are integrated as mass fractions, the
//! temperature follows the energy release through the specific heat and `e` accumulates the
//! released energy on top of the initial internal energy.
//!
//! ## Thermodynamics between EOS calls
//! The right-hand side works on a cleaned copy of the integrated vector (mass fractions clamped
//! into `[small_x_safe, 1]`, temperature clamped into `[T_min, max_temp]`) and refreshes the
//! thermodynamics before every network call:
//! - `call_eos_in_rhs`: EOS(rho, T) on every call
//! - otherwise, once T has moved by more than `dT_crit T` from the last EOS temperature: EOS call
//!   and new specific-heat slopes
//! - otherwise only the composition means are updated
use crate::Integration::coupling::{CouplingLayer, plausible_composition};
use crate::Integration::dvode::OdeSystem;
use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::eos_composition::{call_eos, composition};
use crate::Interfaces::eos_type::{Eos, EosInput, EosState};
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::{Network, jac_y_to_x, net_ienuc, net_itemp, neqs, ydot_y_to_x};
use crate::Interfaces::numerical_jacobian::{JacobianScratch, numerical_jac};
use crate::Interfaces::temperature_integration::{temperature_jac, temperature_rhs};
use crate::settings::{BurnerSettings, JacobianMode};
use nalgebra::{DMatrix, DVector};
use std::ops::Range;

pub struct StrangSystem<'a, N: Network + ?Sized, E: Eos + ?Sized> {
    network: &'a N,
    eos: &'a E,
    settings: &'a BurnerSettings,
    state: &'a mut BurnState,
    /// burn state evaluated by the right-hand side and Jacobian
    work: BurnState,
    eos_state: EosState,
    jac_scratch: JacobianScratch,
    call_eos_in_rhs: bool,
    /// internal energy at the start of the burn
    e_in: f64,
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> StrangSystem<'a, N, E> {
    pub fn new(
        network: &'a N,
        eos: &'a E,
        settings: &'a BurnerSettings,
        state: &'a mut BurnState,
    ) -> Self {
        let work = state.clone();
        let eos_state = EosState::new(state.nspec(), state.aux.len());
        let jac_scratch = JacobianScratch::new(state);
        Self {
            network,
            eos,
            settings,
            state,
            work,
            eos_state,
            jac_scratch,
            call_eos_in_rhs: settings.call_eos_in_rhs,
            e_in: 0.0,
        }
    }

    /// Keep the thermodynamics frozen between the EOS calls forced by `dT_crit`.
    pub fn without_eos_in_rhs(mut self) -> Self {
        self.call_eos_in_rhs = false;
        self
    }

    pub fn e_in(&self) -> f64 {
        self.e_in
    }

    pub fn network(&self) -> &N {
        self.network
    }

    /// Clamp the species and temperature of `y` in place; renormalize when configured.
    pub fn clean(&self, y: &mut DVector<f64>) {
        let nspec = self.state.nspec();
        for n in 0..nspec {
            y[n] = y[n].min(1.0).max(self.settings.small_x_safe);
        }
        if self.settings.renormalize_abundances {
            let sum: f64 = (0..nspec).map(|n| y[n]).sum();
            for n in 0..nspec {
                y[n] /= sum;
            }
        }
        let itemp = net_itemp(nspec);
        y[itemp] = y[itemp].max(self.eos.mintemp()).min(self.settings.max_temp);
    }

    /// load the cleaned values of `y` into the work state
    fn load(&mut self, y: &DVector<f64>) {
        let nspec = self.state.nspec();
        for n in 0..nspec {
            self.work.xn[n] = y[n].min(1.0).max(self.settings.small_x_safe);
        }
        if self.settings.renormalize_abundances {
            let sum = self.work.xn.sum();
            self.work.xn /= sum;
        }
        self.work.T = y[net_itemp(nspec)]
            .max(self.eos.mintemp())
            .min(self.settings.max_temp);
        self.work.e = y[net_ienuc(nspec)];
    }

    /// Bring the derived thermodynamic quantities of the work state up to date.
    fn update_thermodynamics(&mut self) -> Result<(), BurnError> {
        let e = self.work.e;
        self.work.burn_to_eos(&mut self.eos_state);
        if self.call_eos_in_rhs && self.work.self_heat {
            call_eos(self.network, self.eos, EosInput::RT, &mut self.eos_state)?;
            self.work.eos_to_burn(&self.eos_state);
        } else if (self.work.T - self.work.T_old).abs() > self.settings.dT_crit * self.work.T
            && self.work.self_heat
        {
            call_eos(self.network, self.eos, EosInput::RT, &mut self.eos_state)?;
            let dT = self.eos_state.T - self.work.T_old;
            self.work.dcvdT = (self.eos_state.cv - self.work.cv_old) / dT;
            self.work.dcpdT = (self.eos_state.cp - self.work.cp_old) / dT;
            self.work.T_old = self.eos_state.T;
            self.work.cv_old = self.eos_state.cv;
            self.work.cp_old = self.eos_state.cp;
            self.work.eos_to_burn(&self.eos_state);
        } else {
            composition(self.network, &mut self.eos_state);
            self.work.abar = self.eos_state.abar;
            self.work.zbar = self.eos_state.zbar;
            self.work.y_e = self.eos_state.y_e;
        }
        // the integrated energy is not an EOS output
        self.work.e = e;
        Ok(())
    }

    /// right-hand side of the network layout at the current work state
    pub(crate) fn work_rhs(&mut self, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        self.network.actual_rhs(&self.work, ydot)?;
        ydot_y_to_x(self.network.aion(), ydot);
        temperature_rhs(&self.work, self.settings, ydot);
        Ok(())
    }
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> OdeSystem for StrangSystem<'a, N, E> {
    fn rhs(&mut self, _t: f64, y: &DVector<f64>, ydot: &mut DVector<f64>) -> Result<(), BurnError> {
        self.load(y);
        self.update_thermodynamics()?;
        self.work_rhs(ydot)
    }

    fn jac(&mut self, _t: f64, y: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), BurnError> {
        self.load(y);
        self.update_thermodynamics()?;
        let analytic = self.settings.jacobian == JacobianMode::Analytic
            && self.network.has_analytic_jacobian();
        if analytic {
            jac.fill(0.0);
            self.network.actual_jac(&self.work, jac)?;
            jac_y_to_x(self.network.aion(), jac);
        } else {
            numerical_jac(
                self.network,
                &self.work,
                self.settings.centered_diff_jac,
                &mut self.jac_scratch,
                jac,
            )?;
        }
        temperature_jac(&self.work, self.settings, jac);
        Ok(())
    }

    fn analytic_jacobian(&self) -> bool {
        true
    }
}

impl<'a, N: Network + ?Sized, E: Eos + ?Sized> CouplingLayer for StrangSystem<'a, N, E> {
    fn neq(&self) -> usize {
        neqs(self.state.nspec())
    }

    fn species_range(&self) -> Range<usize> {
        0..self.state.nspec()
    }

    fn tolerances(&self, rtol: &mut DVector<f64>, atol: &mut DVector<f64>) {
        let nspec = self.state.nspec();
        for n in 0..nspec {
            rtol[n] = self.settings.rtol_spec;
            atol[n] = self.settings.atol_spec;
        }
        rtol[net_itemp(nspec)] = self.settings.rtol_temp;
        atol[net_itemp(nspec)] = self.settings.atol_temp;
        rtol[net_ienuc(nspec)] = self.settings.rtol_enuc;
        atol[net_ienuc(nspec)] = self.settings.atol_enuc;
    }

    fn pack(&mut self, y: &mut DVector<f64>) -> Result<(), BurnError> {
        let nspec = self.state.nspec();
        self.state.burn_to_eos(&mut self.eos_state);
        call_eos(self.network, self.eos, EosInput::RT, &mut self.eos_state)?;
        self.state.eos_to_burn(&self.eos_state);
        self.e_in = self.state.e;

        self.state.T_old = self.state.T;
        self.state.cv_old = self.state.cv;
        self.state.cp_old = self.state.cp;
        if self.settings.dT_crit < 1.0e19 {
            // initial slope of the specific heats
            self.eos_state.T *= 1.0 + f64::EPSILON.sqrt();
            call_eos(self.network, self.eos, EosInput::RT, &mut self.eos_state)?;
            let dT = self.eos_state.T - self.state.T_old;
            self.state.dcvdT = (self.eos_state.cv - self.state.cv_old) / dT;
            self.state.dcpdT = (self.eos_state.cp - self.state.cp_old) / dT;
        }
        self.state.self_heat = self.settings.self_heat;
        self.work.clone_from(&*self.state);

        for n in 0..nspec {
            y[n] = self.state.xn[n];
        }
        y[net_itemp(nspec)] = self.state.T;
        y[net_ienuc(nspec)] = self.state.e;
        Ok(())
    }

    fn plausible(&self, y: &DVector<f64>) -> bool {
        let nspec = self.state.nspec();
        plausible_composition((0..nspec).map(|n| y[n]), y[net_itemp(nspec)])
    }

    fn unpack(&mut self, y: &DVector<f64>) -> Result<(), BurnError> {
        let nspec = self.state.nspec();
        for n in 0..nspec {
            self.state.xn[n] = y[n];
        }
        self.state.T = y[net_itemp(nspec)]
            .max(self.eos.mintemp())
            .min(self.settings.max_temp);
        self.state.e = y[net_ienuc(nspec)];
        self.state.e_nuc = self.state.e - self.e_in;
        self.state.normalize_abundances(self.settings.small_x_safe);
        Ok(())
    }

    fn state(&self) -> &BurnState {
        &*self.state
    }

    fn state_mut(&mut self) -> &mut BurnState {
        &mut *self.state
    }

    fn settings(&self) -> &BurnerSettings {
        self.settings
    }
}
