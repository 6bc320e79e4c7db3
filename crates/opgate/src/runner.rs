//! Sequential pass execution.

use std::time::Instant;

use tracing::info;

use crate::context::PassContext;
use crate::error::GateError;
use crate::pass::PassName;
use crate::registry::PassRegistry;

/// Lifecycle of one pass within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// Final state of one requested pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRecord {
    pub pass: PassName,
    pub state: PassState,
    pub duration_ms: u64,
}

/// The pass that stopped the run and why.
#[derive(Debug, thiserror::Error)]
#[error("{pass} pass failed: {error}")]
pub struct PassFailure {
    pub pass: PassName,
    #[source]
    pub error: GateError,
}

/// Result of executing a list of passes.
#[derive(Debug)]
pub struct PipelineResult {
    /// One record per requested pass, in request order.
    pub records: Vec<PassRecord>,

    /// Set when a pass failed; later passes stay `NotStarted`.
    pub failure: Option<PassFailure>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Passes that actually started, in order.
    pub fn attempted(&self) -> Vec<PassName> {
        self.records
            .iter()
            .filter(|r| r.state != PassState::NotStarted)
            .map(|r| r.pass)
            .collect()
    }

    pub fn passed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == PassState::Succeeded)
            .count()
    }

    /// `0` on success, otherwise the failing error's code.
    pub fn exit_code(&self) -> u8 {
        match &self.failure {
            None => 0,
            Some(failure) => failure.error.exit_code(),
        }
    }
}

/// Runs passes one at a time, stopping at the first failure.
pub struct PassRunner<'a> {
    ctx: PassContext<'a>,
}

impl<'a> PassRunner<'a> {
    pub fn new(ctx: PassContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, requested: &[PassName]) -> PipelineResult {
        let start = Instant::now();
        let mut records: Vec<PassRecord> = requested
            .iter()
            .map(|pass| PassRecord {
                pass: *pass,
                state: PassState::NotStarted,
                duration_ms: 0,
            })
            .collect();

        info!(passes = ?requested, "Starting run");
        let mut failure = None;

        for record in records.iter_mut() {
            let pass = record.pass;
            record.state = PassState::Running;
            self.ctx.reporter.pass_started(pass);

            let pass_start = Instant::now();
            let outcome = PassRegistry::run(pass, &self.ctx).await;
            record.duration_ms = pass_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    record.state = PassState::Succeeded;
                    self.ctx.reporter.pass_succeeded(pass, record.duration_ms);
                }
                Err(error) => {
                    record.state = PassState::Failed;
                    let pass_failure = PassFailure { pass, error };
                    self.ctx.reporter.pass_failed(&pass_failure, record.duration_ms);
                    failure = Some(pass_failure);
                    break;
                }
            }
        }

        PipelineResult {
            records,
            failure,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
