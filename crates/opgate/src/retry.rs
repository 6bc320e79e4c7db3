//! Warm-cache double run for test commands.
//!
//! Every test command is run twice back to back. The first attempt carries
//! the runner's warm-cache flag so compiled dependencies are installed; the
//! second is the plain invocation. Both attempts must succeed.

use tracing::info;

use crate::error::Result;
use crate::invoker::{CommandResult, CommandSpec, Invoker};

/// Number of attempts made for every test command.
pub const ATTEMPTS: usize = 2;

/// Runs test commands through an [`Invoker`] with the warm-cache double run.
pub struct RetryableRunner<'a> {
    invoker: &'a dyn Invoker,
}

impl<'a> RetryableRunner<'a> {
    pub fn new(invoker: &'a dyn Invoker) -> Self {
        Self { invoker }
    }

    /// Run the command built by `build` twice.
    ///
    /// `build(true)` must produce the warm-cache variant. The second attempt
    /// is skipped when the first fails. Returns the second attempt's result.
    pub async fn run_twice<F>(&self, build: F) -> Result<CommandResult>
    where
        F: Fn(bool) -> CommandSpec,
    {
        let warm = build(true);
        info!(step = %warm.label, attempt = 1, warm_cache = true, "Running test command");
        self.invoker.run(&warm).await.into_result()?;

        let plain = build(false);
        info!(step = %plain.label, attempt = ATTEMPTS, warm_cache = false, "Running test command");
        self.invoker.run(&plain).await.into_result()
    }
}
