//! opgate - pass orchestration for operator CI runs
//!
//! Runs an ordered list of verification passes against a project checkout:
//! - `fmt`: generated code, formatting, vet, analyzers, license headers
//! - `build`: operator binaries and container image
//! - `e2e`, `e2eslow`, `e2esh`, `upgrade`: cluster test tiers
//! - `unit`: per-package tests with merged coverage
//!
//! The first failing pass stops the run and decides the exit code.

pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod fakes;
pub mod invoker;
pub mod ledger;
pub mod license;
pub mod outcome;
pub mod packages;
pub mod pass;
pub mod passes;
pub mod registry;
pub mod reporter;
pub mod retry;
pub mod runner;
pub mod sources;
pub mod telemetry;
pub mod toolchain;
pub mod validate;

// Re-export key types
pub use config::{ConfigKey, RunConfiguration};
pub use context::PassContext;
pub use coverage::{CoverageAggregator, CoverageReport};
pub use error::{GateError, Result, EXIT_FAILURE, EXIT_POLICY_VIOLATION};
pub use invoker::{CommandResult, CommandSpec, Invoker, SystemInvoker};
pub use ledger::FailureLedger;
pub use outcome::BestEffortFailure;
pub use pass::{parse_passes, PassName};
pub use registry::PassRegistry;
pub use reporter::Reporter;
pub use retry::RetryableRunner;
pub use runner::{PassFailure, PassRunner, PassState, PipelineResult};
pub use telemetry::init_tracing;
pub use toolchain::Toolchain;
