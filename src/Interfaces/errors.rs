//! Error types.
//!
//! Failures that happen inside an integration are never propagated as `Err` to the caller of a
//! burn: they end up as `success = false` and an [`IntegrationStatus`] on the burn state. The
//! `Result`-returning functions of the crate are the closures themselves (EOS and network calls,
//! which the integrators convert into a failed step) and the setup layer (configuration, tables).
use crate::Interfaces::eos_type::EosInput;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// errors signalled by an equation of state
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EosError {
    #[error("non-positive or non-finite density {0} passed to the EOS")]
    BadDensity(f64),
    #[error("non-finite input to the EOS in mode {mode:?}: {value}")]
    NonFiniteInput { mode: EosInput, value: f64 },
    #[error("EOS inversion in mode {mode:?} is not possible: {reason}")]
    InversionFailed { mode: EosInput, reason: String },
}

/// errors of the burner, its closures and its setup
#[derive(Debug, Error)]
pub enum BurnError {
    #[error("EOS failure: {0}")]
    Eos(#[from] EosError),
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("table error: {0}")]
    Table(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// outcome of an integration, kept on the burn state next to the success flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationStatus {
    /// reached the requested time
    Success,
    /// more internal steps than `ode_max_steps`
    TooManySteps,
    /// the requested accuracy is below machine precision for the current solution
    ExcessAccuracyRequested,
    /// repeated local error test failures
    ErrorTestFailures,
    /// repeated Newton corrector convergence failures
    ConvergenceFailures,
    /// an error weight became non-positive
    BadErrorWeight,
    /// a closure (EOS or network) failed outside a retryable step attempt
    ClosureFailure,
    /// the solver converged but the result failed the physical plausibility checks
    PlausibilityViolation,
}

impl IntegrationStatus {
    /// the classical integer `istate` code of the status
    pub fn istate(&self) -> i32 {
        match self {
            IntegrationStatus::Success => 2,
            IntegrationStatus::TooManySteps => -1,
            IntegrationStatus::ExcessAccuracyRequested => -2,
            IntegrationStatus::ErrorTestFailures => -4,
            IntegrationStatus::ConvergenceFailures => -5,
            IntegrationStatus::BadErrorWeight => -6,
            IntegrationStatus::ClosureFailure => -8,
            // the solver itself succeeded
            IntegrationStatus::PlausibilityViolation => 2,
        }
    }

    pub fn solver_succeeded(&self) -> bool {
        self.istate() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_istate_codes() {
        assert_eq!(IntegrationStatus::Success.istate(), 2);
        assert_eq!(IntegrationStatus::TooManySteps.istate(), -1);
        assert!(!IntegrationStatus::ConvergenceFailures.solver_succeeded());
        assert!(IntegrationStatus::PlausibilityViolation.solver_succeeded());
    }

    #[test]
    fn test_error_messages() {
        let err: BurnError = EosError::BadDensity(-1.0).into();
        assert!(err.to_string().contains("EOS failure"));
        let err = BurnError::DimensionMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, found 2");
    }
}
