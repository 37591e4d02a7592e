//! # Gamma-law equation of state
//!
//! Ideal gas of fully ionized nuclei and electrons with a constant adiabatic index:
//!
//! p = rho k T (1 + zbar) / (abar m_u),   e = p / ((gamma - 1) rho),   h = e + p/rho = gamma e
//!
//! Every input mode inverts analytically. Temperatures are clamped into [mintemp, maxtemp] and
//! the remaining quantities are evaluated at the clamped temperature.
use crate::Interfaces::constants::R_GAS;
use crate::Interfaces::eos_type::{Eos, EosInput, EosState};
use crate::Interfaces::errors::EosError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaLaw {
    pub gamma: f64,
    pub mintemp: f64,
    pub maxtemp: f64,
}

impl Default for GammaLaw {
    fn default() -> Self {
        Self {
            gamma: 5.0 / 3.0,
            mintemp: 1.0e4,
            maxtemp: 1.0e12,
        }
    }
}

impl GammaLaw {
    pub fn new(gamma: f64) -> Self {
        Self {
            gamma,
            ..Self::default()
        }
    }

    fn check_finite(input: EosInput, value: f64) -> Result<(), EosError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(EosError::NonFiniteInput { mode: input, value })
        }
    }
}

impl Eos for GammaLaw {
    fn eos(&self, input: EosInput, state: &mut EosState) -> Result<(), EosError> {
        if !(state.rho > 0.0) || !state.rho.is_finite() {
            return Err(EosError::BadDensity(state.rho));
        }
        if !(state.abar > 0.0) || !state.abar.is_finite() {
            return Err(EosError::InversionFailed {
                mode: input,
                reason: format!("mean nucleon number {} is not positive", state.abar),
            });
        }
        let gm1 = self.gamma - 1.0;
        // e = c T
        let c = R_GAS * (1.0 + state.zbar) / (state.abar * gm1);

        let T = match input {
            EosInput::RT => {
                Self::check_finite(input, state.T)?;
                state.T
            }
            EosInput::RE => {
                Self::check_finite(input, state.e)?;
                state.e / c
            }
            EosInput::RH => {
                Self::check_finite(input, state.h)?;
                state.h / (self.gamma * c)
            }
            EosInput::RP => {
                Self::check_finite(input, state.p)?;
                state.p / (gm1 * state.rho * c)
            }
        };
        state.T = T.clamp(self.mintemp, self.maxtemp);

        state.e = c * state.T;
        state.p = gm1 * state.rho * state.e;
        state.h = self.gamma * state.e;

        state.cv = c;
        state.cp = self.gamma * c;
        state.dedT = c;
        state.dedr = 0.0;
        state.dpdT = gm1 * state.rho * c;
        state.dpdr = gm1 * state.e;
        state.dhdT = self.gamma * c;
        state.dhdr = 0.0;

        state.dedA = -state.e / state.abar;
        state.dedZ = state.e / (1.0 + state.zbar);
        state.dpdA = gm1 * state.rho * state.dedA;
        state.dpdZ = gm1 * state.rho * state.dedZ;

        state.gam1 = self.gamma;
        state.cs = (self.gamma * state.p / state.rho).sqrt();
        state.eta = 0.0;
        Ok(())
    }

    fn mintemp(&self) -> f64 {
        self.mintemp
    }

    fn maxtemp(&self) -> f64 {
        self.maxtemp
    }
}
