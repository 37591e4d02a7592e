//! # Settings Module
//!
//! ## Purpose
//! Runtime configuration of the burner: integration tolerances, step limits, Jacobian policy,
//! thermodynamic update policy, clamping bounds and the choice of integrator and coupling.
//!
//! ## Key Features
//! - **Defaults**: `BurnerSettings::default()` gives a configuration suited to stiff
//!   thermonuclear burning
//! - **Builder style**: `with_*` methods for the settings changed most often
//! - **Validation**: `validate()` rejects inconsistent values before a burn starts
//! - **Persistence**: JSON load/save through `serde_json`
//!
//! ## Usage Pattern
//! ```rust
//! use NuBurn::settings::{BurnerSettings, IntegratorKind};
//!
//! let settings = BurnerSettings::default()
//!     .with_integrator(IntegratorKind::Vode)
//!     .with_species_tolerances(1.0e-10, 1.0e-10);
//! assert!(settings.validate().is_ok());
//! ```
//!
//! ## Main Parameters
//! | Parameter | Default | Meaning |
//! |-----------|---------|---------|
//! | `ode_max_steps` | 150000 | internal steps allowed per burn |
//! | `ode_max_dt` | 1e30 | largest internal step |
//! | `max_steps_between_jacobian_evals` | 50 | Jacobian reuse window |
//! | `call_eos_in_rhs` | true | EOS call in every right-hand side |
//! | `dT_crit` | 1e20 | relative temperature change that forces an EOS call |
//! | `small_x_safe` | 1e-30 | floor of the mass fractions |
//! | `max_temp` | 1e11 | ceiling of the temperature |
#![allow(non_snake_case)]
use crate::Interfaces::burn_type::SdcEvolve;
use crate::Interfaces::errors::BurnError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorKind {
    /// variable-order BDF
    Vode,
    /// explicit fallback with adaptive substeps
    ForwardEuler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouplingKind {
    /// operator split: integrate (X, T, e) with frozen density
    Strang,
    /// integrate conserved variables with advective sources
    SimplifiedSdc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JacobianMode {
    /// network-provided Jacobian, differences when the network has none
    Analytic,
    /// finite differences only
    Numerical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnerSettings {
    pub rtol_spec: f64,
    pub atol_spec: f64,
    pub rtol_temp: f64,
    pub atol_temp: f64,
    pub rtol_enuc: f64,
    pub atol_enuc: f64,

    pub ode_max_steps: usize,
    pub ode_max_dt: f64,
    /// forward Euler: largest relative change of X, T or e in one substep
    pub maximum_timestep_change_factor: f64,
    pub max_steps_between_jacobian_evals: usize,
    pub jacobian: JacobianMode,
    pub centered_diff_jac: bool,

    pub call_eos_in_rhs: bool,
    pub dT_crit: f64,
    pub renormalize_abundances: bool,
    pub do_constant_volume_burn: bool,
    pub self_heat: bool,

    pub small_x_safe: f64,
    pub max_temp: f64,

    /// reject BDF steps that change a species by more than the factors below
    pub use_species_change_limiter: bool,
    pub species_increase_change_factor: f64,
    pub species_decrease_change_factor: f64,

    pub integrator: IntegratorKind,
    pub coupling: CouplingKind,
    pub sdc_evolve: SdcEvolve,
    /// enthalpy SDC: find the temperature from the base-state pressure
    pub use_tfromp: bool,

    pub burner_verbose: bool,
}

impl Default for BurnerSettings {
    fn default() -> Self {
        Self {
            rtol_spec: 1.0e-12,
            atol_spec: 1.0e-8,
            rtol_temp: 1.0e-6,
            atol_temp: 1.0e-6,
            rtol_enuc: 1.0e-6,
            atol_enuc: 1.0e-6,
            ode_max_steps: 150000,
            ode_max_dt: 1.0e30,
            maximum_timestep_change_factor: 1.01,
            max_steps_between_jacobian_evals: 50,
            jacobian: JacobianMode::Analytic,
            centered_diff_jac: false,
            call_eos_in_rhs: true,
            dT_crit: 1.0e20,
            renormalize_abundances: false,
            do_constant_volume_burn: true,
            self_heat: true,
            small_x_safe: 1.0e-30,
            max_temp: 1.0e11,
            use_species_change_limiter: false,
            species_increase_change_factor: 2.0,
            species_decrease_change_factor: 0.5,
            integrator: IntegratorKind::Vode,
            coupling: CouplingKind::Strang,
            sdc_evolve: SdcEvolve::Energy,
            use_tfromp: false,
            burner_verbose: false,
        }
    }
}

impl BurnerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_integrator(mut self, integrator: IntegratorKind) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_coupling(mut self, coupling: CouplingKind) -> Self {
        self.coupling = coupling;
        self
    }

    pub fn with_sdc_evolve(mut self, evolve: SdcEvolve) -> Self {
        self.coupling = CouplingKind::SimplifiedSdc;
        self.sdc_evolve = evolve;
        self
    }

    pub fn with_jacobian(mut self, jacobian: JacobianMode) -> Self {
        self.jacobian = jacobian;
        self
    }

    pub fn with_species_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol_spec = rtol;
        self.atol_spec = atol;
        self
    }

    pub fn with_temperature_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol_temp = rtol;
        self.atol_temp = atol;
        self
    }

    pub fn with_energy_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol_enuc = rtol;
        self.atol_enuc = atol;
        self
    }

    pub fn with_self_heat(mut self, self_heat: bool) -> Self {
        self.self_heat = self_heat;
        self
    }

    pub fn with_max_steps(mut self, ode_max_steps: usize) -> Self {
        self.ode_max_steps = ode_max_steps;
        self
    }

    pub fn with_verbose(mut self, burner_verbose: bool) -> Self {
        self.burner_verbose = burner_verbose;
        self
    }

    /// Checks the settings for values no burn can run with.
    pub fn validate(&self) -> Result<(), BurnError> {
        let tolerances = [
            ("rtol_spec", self.rtol_spec),
            ("atol_spec", self.atol_spec),
            ("rtol_temp", self.rtol_temp),
            ("atol_temp", self.atol_temp),
            ("rtol_enuc", self.rtol_enuc),
            ("atol_enuc", self.atol_enuc),
        ];
        for (name, value) in tolerances {
            if !(value > 0.0) || !value.is_finite() {
                return Err(BurnError::InvalidConfiguration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.ode_max_steps == 0 {
            return Err(BurnError::InvalidConfiguration(
                "ode_max_steps must be at least 1".to_owned(),
            ));
        }
        if self.max_steps_between_jacobian_evals == 0 {
            return Err(BurnError::InvalidConfiguration(
                "max_steps_between_jacobian_evals must be at least 1".to_owned(),
            ));
        }
        if !(self.ode_max_dt > 0.0) {
            return Err(BurnError::InvalidConfiguration(format!(
                "ode_max_dt must be positive, got {}",
                self.ode_max_dt
            )));
        }
        if !(self.maximum_timestep_change_factor > 1.0) {
            return Err(BurnError::InvalidConfiguration(format!(
                "maximum_timestep_change_factor must exceed 1, got {}",
                self.maximum_timestep_change_factor
            )));
        }
        if !(self.dT_crit > 0.0) {
            return Err(BurnError::InvalidConfiguration(format!(
                "dT_crit must be positive, got {}",
                self.dT_crit
            )));
        }
        if !(self.small_x_safe >= 0.0 && self.small_x_safe < 1.0) {
            return Err(BurnError::InvalidConfiguration(format!(
                "small_x_safe must lie in [0, 1), got {}",
                self.small_x_safe
            )));
        }
        if !(self.max_temp > 0.0) {
            return Err(BurnError::InvalidConfiguration(format!(
                "max_temp must be positive, got {}",
                self.max_temp
            )));
        }
        if !(self.species_increase_change_factor > 1.0)
            || !(self.species_decrease_change_factor > 0.0
                && self.species_decrease_change_factor < 1.0)
        {
            return Err(BurnError::InvalidConfiguration(
                "species change factors must satisfy decrease < 1 < increase".to_owned(),
            ));
        }
        if self.integrator == IntegratorKind::ForwardEuler
            && self.coupling == CouplingKind::SimplifiedSdc
        {
            return Err(BurnError::InvalidConfiguration(
                "the forward Euler integrator supports Strang coupling only".to_owned(),
            ));
        }
        Ok(())
    }

    /// Loads settings from a JSON file and validates them.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BurnError> {
        let content = fs::read_to_string(path)?;
        let settings: BurnerSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Saves settings as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BurnError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let settings = BurnerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.ode_max_steps, 150000);
        assert_eq!(settings.max_steps_between_jacobian_evals, 50);
        assert!(settings.call_eos_in_rhs);
        assert!(!settings.use_species_change_limiter);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = BurnerSettings::default();
        settings.rtol_spec = 0.0;
        assert!(settings.validate().is_err());

        let settings = BurnerSettings::default().with_max_steps(0);
        assert!(settings.validate().is_err());

        let mut settings = BurnerSettings::default();
        settings.maximum_timestep_change_factor = 1.0;
        assert!(settings.validate().is_err());

        let settings = BurnerSettings::default()
            .with_integrator(IntegratorKind::ForwardEuler)
            .with_sdc_evolve(SdcEvolve::Energy);
        assert!(matches!(
            settings.validate(),
            Err(BurnError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let settings = BurnerSettings::default()
            .with_sdc_evolve(SdcEvolve::Enthalpy)
            .with_jacobian(JacobianMode::Numerical)
            .with_verbose(true);
        settings.save(file.path()).unwrap();
        let loaded = BurnerSettings::load(file.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ \"rtol_spec\": 1.0 }").unwrap();
        assert!(matches!(
            BurnerSettings::load(file.path()),
            Err(BurnError::Json(_))
        ));

        let mut settings = BurnerSettings::default();
        settings.atol_temp = -1.0;
        let file = NamedTempFile::new().unwrap();
        settings.save(file.path()).unwrap();
        assert!(BurnerSettings::load(file.path()).is_err());
    }
}
