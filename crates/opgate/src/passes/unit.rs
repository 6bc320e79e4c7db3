//! `unit`: per-package tests with merged coverage.

use tracing::info;

use crate::context::PassContext;
use crate::coverage::{CoverageAggregator, CoverageReport};
use crate::error::Result;
use crate::invoker::CommandSpec;
use crate::outcome::BestEffortFailure;
use crate::packages;

pub async fn run(ctx: &PassContext<'_>) -> Result<()> {
    let packages = packages::discover(ctx).await?;
    let mut coverage = CoverageAggregator::start(ctx.workspace, &ctx.toolchain.coverage).await?;

    for package in &packages {
        ctx.reporter.step(&format!("Testing {}...", package));
        coverage.clear_fragment().await?;

        let run = ctx
            .retry()
            .run_twice(|warm| unit_command(ctx, package, &coverage, warm))
            .await;
        if let Err(e) = run {
            coverage.clear_fragment().await?;
            return Err(e);
        }

        if !coverage.fold_fragment().await? {
            info!(package = %package, "No coverage fragment produced");
        }
    }

    let report_path = coverage.report_path().to_path_buf();
    let merged = coverage.fragments_merged();
    let report = coverage.finish().await?;
    ctx.reporter.step(&format!(
        "Merged {} coverage fragment(s), {} record(s) into {}",
        merged,
        report.records().len(),
        report_path.display()
    ));

    upload(ctx, &report, &report_path).await;
    Ok(())
}

fn unit_command(
    ctx: &PassContext<'_>,
    package: &str,
    coverage: &CoverageAggregator,
    warm_cache: bool,
) -> CommandSpec {
    let runner = &ctx.toolchain.test;
    let mut spec = ctx.spec(&runner.command, format!("unit tests {}", package));
    if warm_cache && !runner.warm_cache_flag.is_empty() {
        spec = spec.arg(&runner.warm_cache_flag);
    }
    if !runner.race_flag.is_empty() {
        spec = spec.arg(&runner.race_flag);
    }
    spec.args(runner.coverage_args.iter().cloned())
        .arg(format!(
            "{}={}",
            runner.coverage_profile_flag,
            coverage.fragment_path().display()
        ))
        .arg(package)
}

/// Hand the report to the upload collaborator. Failures are logged only.
async fn upload(ctx: &PassContext<'_>, report: &CoverageReport, path: &std::path::Path) {
    let Some(template) = &ctx.toolchain.coverage.upload else {
        return;
    };
    let name = template.display_name().to_string();
    if report.is_empty() {
        ctx.reporter.step("No coverage collected, skipping upload");
        return;
    }
    let spec = ctx
        .spec(template, "coverage upload")
        .arg(path.display().to_string());
    if !ctx.invoker.is_available(&spec) {
        ctx.reporter.best_effort(&BestEffortFailure::unavailable(&name));
        return;
    }

    let result = ctx.invoker.run(&spec).await;
    if !result.passed() {
        let detail = match result.combined_output() {
            output if output.is_empty() => format!("exited with code {}", result.exit_code),
            output => output,
        };
        ctx.reporter
            .best_effort(&BestEffortFailure::reported("coverage upload", detail));
    }
}
