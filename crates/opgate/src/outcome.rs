//! Outcomes of optional collaborators.
//!
//! Optional analyzers and the coverage upload can fail without failing the
//! pass. Their failures are values of [`BestEffortFailure`], which the
//! reporter logs and the runner never turns into a [`crate::GateError`].

use std::fmt;

/// Why an optional step did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffortReason {
    /// The tool is not installed.
    Unavailable,

    /// The tool ran and reported findings or exited non-zero.
    Reported(String),
}

/// A logged-but-ignored failure of an optional step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestEffortFailure {
    pub step: String,
    pub reason: BestEffortReason,
}

impl BestEffortFailure {
    pub fn unavailable(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            reason: BestEffortReason::Unavailable,
        }
    }

    pub fn reported(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            reason: BestEffortReason::Reported(detail.into()),
        }
    }
}

impl fmt::Display for BestEffortFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            BestEffortReason::Unavailable => write!(f, "Skipping {}: not installed", self.step),
            BestEffortReason::Reported(detail) => {
                write!(f, "{} reported issues (ignored):\n{}", self.step, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_distinguishes_reasons() {
        let skipped = BestEffortFailure::unavailable("gosimple");
        assert_eq!(skipped.to_string(), "Skipping gosimple: not installed");

        let reported = BestEffortFailure::reported("coverage upload", "connection refused");
        assert!(reported.to_string().contains("connection refused"));
        assert!(reported.to_string().contains("ignored"));
    }
}
