//! External command execution.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{GateError, Result};

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Human-readable step name used in status lines and errors.
    pub label: String,

    /// Executable to run.
    pub program: String,

    /// Arguments, in order.
    pub args: Vec<String>,

    /// Extra environment variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,

    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program and arguments joined by spaces, for logs and test matching.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Step label copied from the spec.
    pub label: String,

    /// Exit code (0 = success, -1 = killed by signal or never spawned).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn success(label: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 0,
        }
    }

    pub fn failure(label: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 0,
        }
    }

    /// Whether the command exited with code 0.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out.trim().to_string()
    }

    /// Convert a non-zero exit into [`GateError::SubprocessFailure`].
    pub fn into_result(self) -> Result<CommandResult> {
        if self.passed() {
            Ok(self)
        } else {
            Err(GateError::SubprocessFailure {
                step: self.label,
                exit_code: self.exit_code,
            })
        }
    }
}

/// Something that can run external commands.
///
/// Implementations never return an error: a command that cannot be spawned
/// comes back as a failed [`CommandResult`] with exit code -1.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run a command to completion.
    async fn run(&self, spec: &CommandSpec) -> CommandResult;

    /// Whether the spec's program can be found, either on the search path or,
    /// for a path like `hack/upload`, relative to the spec's working directory.
    fn is_available(&self, spec: &CommandSpec) -> bool;
}

/// Destination for forwarded subprocess output.
pub type EchoSink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Invoker backed by real subprocesses.
///
/// Output is read line by line while the child runs. Each line is forwarded
/// to the echo sinks as soon as it arrives and also kept for the result.
#[derive(Clone, Default)]
pub struct SystemInvoker {
    stdout: Option<EchoSink>,
    stderr: Option<EchoSink>,
}

impl SystemInvoker {
    /// Create an invoker that forwards output to this process's stdout/stderr.
    pub fn new() -> Self {
        Self {
            stdout: Some(sink(Box::new(std::io::stdout()))),
            stderr: Some(sink(Box::new(std::io::stderr()))),
        }
    }

    /// Create an invoker that only captures output.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Create an invoker that forwards both streams to `out`.
    pub fn echo_to(out: Box<dyn Write + Send>) -> Self {
        let out = sink(out);
        Self {
            stdout: Some(out.clone()),
            stderr: Some(out),
        }
    }
}

impl fmt::Debug for SystemInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemInvoker")
            .field("echo", &self.stdout.is_some())
            .finish()
    }
}

fn sink(out: Box<dyn Write + Send>) -> EchoSink {
    Arc::new(Mutex::new(out))
}

/// Copy `reader` line by line into a string, forwarding each line to `echo`.
async fn forward<R>(reader: Option<R>, echo: Option<EchoSink>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(reader) = reader else {
        return captured;
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if let Some(echo) = &echo {
                    if let Ok(mut out) = echo.lock() {
                        out.write_all(&line).ok();
                        out.flush().ok();
                    }
                }
                captured.push_str(&String::from_utf8_lossy(&line));
            }
            Err(e) => {
                debug!(error = %e, "Stopped reading command output");
                break;
            }
        }
    }
    captured
}

#[async_trait]
impl Invoker for SystemInvoker {
    async fn run(&self, spec: &CommandSpec) -> CommandResult {
        let start = Instant::now();
        debug!(step = %spec.label, command = %spec.command_line(), "Spawning command");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let mut result = CommandResult::failure(
                    spec.label.clone(),
                    -1,
                    format!("failed to run {}: {}\n", spec.program, e),
                );
                result.duration_ms = start.elapsed().as_millis() as u64;
                if let Some(echo) = &self.stderr {
                    if let Ok(mut out) = echo.lock() {
                        out.write_all(result.stderr.as_bytes()).ok();
                    }
                }
                return result;
            }
        };

        let stdout = forward(child.stdout.take(), self.stdout.clone());
        let stderr = forward(child.stderr.take(), self.stderr.clone());
        let (stdout, mut stderr, status) = tokio::join!(stdout, stderr, child.wait());

        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                stderr.push_str(&format!("failed to wait for {}: {}\n", spec.program, e));
                -1
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(step = %spec.label, exit_code, duration_ms, "Command finished");
        CommandResult {
            label: spec.label.clone(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
        }
    }

    fn is_available(&self, spec: &CommandSpec) -> bool {
        let program = Path::new(&spec.program);
        if program.components().count() > 1 {
            return match &spec.cwd {
                Some(dir) if program.is_relative() => dir.join(program).is_file(),
                _ => program.is_file(),
            };
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}
