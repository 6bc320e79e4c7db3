//! Error taxonomy for pass orchestration.
//!
//! Every variant here is fatal for the pass that produced it. Optional
//! collaborators report through [`crate::outcome::BestEffortFailure`] instead,
//! which is deliberately not a variant of [`GateError`].

use crate::config::ConfigKey;
use crate::ledger::FailureLedger;
use crate::pass::PassName;

/// Exit code for a failed build/test pass or any other fatal error.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code reserved for lint/policy violations.
pub const EXIT_POLICY_VIOLATION: u8 = 255;

/// Fatal orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("pass {pass}: missing required configuration: {}", render_keys(.keys))]
    MissingConfiguration { pass: PassName, keys: Vec<ConfigKey> },

    #[error("unknown pass: {0}")]
    UnknownPass(String),

    #[error("{step} exited with code {exit_code}")]
    SubprocessFailure { step: String, exit_code: i32 },

    #[error("{}", .0.summary())]
    PolicyViolation(FailureLedger),

    #[error("invalid toolchain: {0}")]
    Toolchain(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    /// Process exit code this error maps to.
    pub fn exit_code(&self) -> u8 {
        match self {
            GateError::PolicyViolation(_) => EXIT_POLICY_VIOLATION,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether this error was raised before any external tool ran.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GateError::MissingConfiguration { .. } | GateError::UnknownPass(_)
        )
    }
}

fn render_keys(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(|k| k.env_var())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, GateError>;
