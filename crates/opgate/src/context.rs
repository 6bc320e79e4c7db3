//! Shared, read-only state handed to every pass.

use std::path::Path;

use crate::config::{ConfigKey, RunConfiguration};
use crate::error::Result;
use crate::invoker::{CommandResult, CommandSpec, Invoker};
use crate::reporter::Reporter;
use crate::retry::RetryableRunner;
use crate::toolchain::{CommandTemplate, Toolchain};

/// Everything a pass operation may touch.
pub struct PassContext<'a> {
    pub config: &'a RunConfiguration,
    pub toolchain: &'a Toolchain,
    pub invoker: &'a dyn Invoker,
    pub reporter: &'a Reporter,
    pub workspace: &'a Path,
}

impl<'a> PassContext<'a> {
    /// Resolve a collaborator template into a spec rooted at the workspace.
    pub fn spec(&self, template: &CommandTemplate, label: impl Into<String>) -> CommandSpec {
        template.to_spec(label, self.workspace)
    }

    /// Copy the given configuration values into the command's environment.
    pub fn with_env(&self, spec: CommandSpec, keys: &[ConfigKey]) -> CommandSpec {
        self.config
            .env_pairs(keys)
            .fold(spec, |spec, (k, v)| spec.env(k, v))
    }

    /// Run a mandatory command; a non-zero exit fails the caller.
    pub async fn run_required(&self, spec: CommandSpec) -> Result<CommandResult> {
        self.invoker.run(&spec).await.into_result()
    }

    pub fn retry(&self) -> RetryableRunner<'a> {
        RetryableRunner::new(self.invoker)
    }
}
