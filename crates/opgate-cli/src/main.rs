//! opgate - run CI passes against an operator checkout
//!
//! Pass names come from the command line, or from `PASSES` when none are
//! given, or default to `fmt build e2e e2eslow unit`. Cluster and image
//! settings are read from the environment once at startup.
//!
//! Exit codes: `0` all passes succeeded, `1` a pass failed, `255` a lint
//! check found violations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, Level};

use opgate::{
    parse_passes, ConfigKey, GateError, PassContext, PassName, PassRunner, Reporter,
    RunConfiguration, SystemInvoker, Toolchain, EXIT_FAILURE,
};

#[derive(Parser, Debug)]
#[command(name = "opgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run CI passes (fmt, build, e2e, unit, ...) and report one verdict", long_about = None)]
struct Cli {
    /// Passes to run, in order (default: $PASSES, else fmt build e2e e2eslow unit)
    passes: Vec<String>,

    /// Project checkout to run against
    #[arg(short, long, default_value = ".", env = "OPGATE_WORKSPACE")]
    workspace: PathBuf,

    /// TOML file overriding collaborator commands
    #[arg(short, long, env = "OPGATE_TOOLCHAIN")]
    toolchain: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// List the known passes and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    opgate::init_tracing(cli.json, level);

    if cli.list {
        print_passes();
        return ExitCode::SUCCESS;
    }

    let reporter = Reporter::stdout();
    match run(&cli, &reporter).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            reporter.aborted(&format_args!("{:#}", e));
            let code = e
                .downcast_ref::<GateError>()
                .map(GateError::exit_code)
                .unwrap_or(EXIT_FAILURE);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli, reporter: &Reporter) -> Result<u8> {
    let config = RunConfiguration::from_env();
    let passes = resolve_passes(&cli.passes, &config)?;
    let toolchain = load_toolchain(cli.toolchain.as_deref())?;
    let workspace = cli
        .workspace
        .canonicalize()
        .with_context(|| format!("Failed to resolve workspace {:?}", cli.workspace))?;

    debug!(workspace = %workspace.display(), passes = ?passes, "Resolved run");

    let invoker = SystemInvoker::new();
    let runner = PassRunner::new(PassContext {
        config: &config,
        toolchain: &toolchain,
        invoker: &invoker,
        reporter,
        workspace: &workspace,
    });

    let result = runner.execute(&passes).await;
    Ok(reporter.finish(&result))
}

/// Command-line names win over `PASSES`; both fall back to the default set.
fn resolve_passes(
    cli_passes: &[String],
    config: &RunConfiguration,
) -> opgate::Result<Vec<PassName>> {
    if cli_passes.is_empty() {
        parse_passes(config.list(ConfigKey::Passes))
    } else {
        parse_passes(cli_passes.iter().flat_map(|p| p.split_whitespace()))
    }
}

fn load_toolchain(path: Option<&Path>) -> Result<Toolchain> {
    match path {
        Some(path) => Toolchain::load(path)
            .with_context(|| format!("Failed to load toolchain {:?}", path)),
        None => Ok(Toolchain::default()),
    }
}

fn print_passes() {
    for pass in PassName::ALL {
        let descriptor = opgate::PassRegistry::descriptor(pass);
        let required: Vec<&str> = descriptor.required.iter().map(|k| k.env_var()).collect();
        let default = if PassName::DEFAULT.contains(&pass) {
            " (default)"
        } else {
            ""
        };
        println!("{:<8} {}{}", pass.as_str(), descriptor.summary, default);
        if !required.is_empty() {
            println!("         requires: {}", required.join(", "));
        }
    }
}
