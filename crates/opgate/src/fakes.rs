//! Scripted invoker for tests.
//!
//! `ScriptedInvoker` records every command it is asked to run and answers
//! according to substring rules, so pass logic can be exercised without any
//! of the real collaborators installed.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::invoker::{CommandResult, CommandSpec, Invoker};

#[derive(Debug, Clone, Default)]
struct Rule {
    pattern: String,
    exit_code: Option<i32>,
    stdout: Option<String>,
    stderr: Option<String>,
    writes: Vec<(PathBuf, String)>,
}

/// In-memory [`Invoker`] driven by substring rules on the command line.
///
/// Commands that match no rule succeed with empty output. When several rules
/// match, all of their effects apply in registration order.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    rules: Vec<Rule>,
    unavailable: HashSet<String>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `exit_code` when the command line contains `pattern`.
    pub fn fail_on(mut self, pattern: &str, exit_code: i32) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            exit_code: Some(exit_code),
            ..Rule::default()
        });
        self
    }

    /// Print `stdout` when the command line contains `pattern`.
    pub fn stdout_on(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            stdout: Some(stdout.to_string()),
            ..Rule::default()
        });
        self
    }

    /// Print `stderr` when the command line contains `pattern`.
    pub fn stderr_on(mut self, pattern: &str, stderr: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            stderr: Some(stderr.to_string()),
            ..Rule::default()
        });
        self
    }

    /// Write `contents` to `path` (relative to the command's cwd) when the
    /// command line contains `pattern`.
    pub fn write_on(mut self, pattern: &str, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            writes: vec![(path.into(), contents.to_string())],
            ..Rule::default()
        });
        self
    }

    /// Report `program` as not installed.
    pub fn unavailable(mut self, program: &str) -> Self {
        self.unavailable.insert(program.to_string());
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines of every command run so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }

    /// Command lines containing `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> Vec<String> {
        self.command_lines()
            .into_iter()
            .filter(|line| line.contains(pattern))
            .collect()
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn run(&self, spec: &CommandSpec) -> CommandResult {
        self.calls.lock().unwrap().push(spec.clone());

        let line = spec.command_line();
        let mut result = CommandResult::success(spec.label.clone(), "");
        for rule in self.rules.iter().filter(|r| line.contains(&r.pattern)) {
            if let Some(code) = rule.exit_code {
                result.exit_code = code;
            }
            if let Some(stdout) = &rule.stdout {
                result.stdout.push_str(stdout);
            }
            if let Some(stderr) = &rule.stderr {
                result.stderr.push_str(stderr);
            }
            for (path, contents) in &rule.writes {
                let path = match &spec.cwd {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                if let Err(e) = std::fs::write(&path, contents) {
                    result.exit_code = -1;
                    result.stderr.push_str(&e.to_string());
                }
            }
        }
        result
    }

    fn is_available(&self, spec: &CommandSpec) -> bool {
        !self.unavailable.contains(&spec.program)
    }
}
