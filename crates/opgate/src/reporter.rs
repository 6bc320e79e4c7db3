//! User-facing status output and exit-code selection.
//!
//! Status lines go to the reporter's writer (stdout in the binary); the same
//! events are mirrored to `tracing` so JSON log pipelines see them too.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::error::GateError;
use crate::outcome::BestEffortFailure;
use crate::pass::PassName;
use crate::runner::{PassFailure, PassState, PipelineResult};

/// Terminal marker printed when every selected pass succeeded.
pub const SUCCESS_MARKER: &str = "test success ===";

/// Writes status lines for one run.
pub struct Reporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Reporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Reporter writing to this process's stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Reporter writing into memory, plus a handle to read what was written.
    pub fn captured() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::new(Box::new(captured.clone())), captured)
    }

    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            writeln!(out, "{}", text).ok();
            out.flush().ok();
        }
    }

    pub fn pass_started(&self, pass: PassName) {
        info!(pass = %pass, "Starting pass");
        self.line(&format!("Running {} pass...", pass));
    }

    pub fn pass_succeeded(&self, pass: PassName, duration_ms: u64) {
        info!(pass = %pass, duration_ms, "Pass succeeded");
        self.line(&format!("{} pass succeeded ({}ms)", pass, duration_ms));
    }

    /// Report a failed pass; lint failures print their full ledger.
    pub fn pass_failed(&self, failure: &PassFailure, duration_ms: u64) {
        error!(pass = %failure.pass, duration_ms, error = %failure.error, "Pass failed");
        if failure.error.is_precondition() {
            self.line(&format!("{} pass not started: {}", failure.pass, failure.error));
            return;
        }
        if let GateError::PolicyViolation(ledger) = &failure.error {
            self.line(ledger.to_string().trim_end());
        }
        self.line(&format!(
            "{} pass failed ({}ms): {}",
            failure.pass, duration_ms, failure.error
        ));
    }

    /// A sub-step inside a pass.
    pub fn step(&self, message: &str) {
        info!("{}", message);
        self.line(message);
    }

    /// Log an optional step's failure. Never affects the verdict.
    pub fn best_effort(&self, failure: &BestEffortFailure) {
        warn!(step = %failure.step, "{}", failure);
        self.line(&failure.to_string());
    }

    /// Report an error raised before any pass ran.
    pub fn aborted(&self, err: &dyn std::fmt::Display) {
        error!(error = %err, "Run aborted");
        self.line(&format!("error: {}", err));
    }

    /// Print the per-pass summary and the final verdict.
    pub fn finish(&self, result: &PipelineResult) -> u8 {
        self.line("");
        self.line("Summary:");
        for record in &result.records {
            let mark = match record.state {
                PassState::Succeeded => "✓",
                PassState::Failed => "✗",
                PassState::NotStarted | PassState::Running => "-",
            };
            let detail = match record.state {
                PassState::NotStarted => "not attempted".to_string(),
                _ => format!("{}ms", record.duration_ms),
            };
            self.line(&format!("  {} {} ({})", mark, record.pass, detail));
        }

        match &result.failure {
            None => {
                info!(duration_ms = result.duration_ms, "All passes succeeded");
                self.line(SUCCESS_MARKER);
            }
            Some(failure) => {
                self.line(&format!(
                    "FAILED: {} pass (exit code {})",
                    failure.pass,
                    result.exit_code()
                ));
            }
        }
        result.exit_code()
    }
}

/// In-memory sink shared between a [`Reporter`] and the test reading it.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).to_string())
            .unwrap_or_default()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "captured output poisoned",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
