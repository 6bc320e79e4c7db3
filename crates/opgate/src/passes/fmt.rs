//! `fmt`: generated-code verification and lint checks.
//!
//! Generated-code verification is a hard gate. The formatter, vet and
//! license checks visit every file and collect violations into one ledger.
//! Analyzers are best-effort.

use std::path::PathBuf;

use crate::context::PassContext;
use crate::error::{GateError, Result};
use crate::ledger::FailureLedger;
use crate::license;
use crate::outcome::BestEffortFailure;
use crate::packages;
use crate::sources;
use crate::toolchain::CommandTemplate;

pub async fn run(ctx: &PassContext<'_>) -> Result<()> {
    let toolchain = ctx.toolchain;

    ctx.reporter.step("Verifying generated code...");
    ctx.run_required(ctx.spec(&toolchain.codegen_verify, "verify generated code"))
        .await?;

    let files = sources::list_source_files(ctx.workspace, &toolchain.sources)?;
    let mut ledger = FailureLedger::new("fmt");

    check_each_file(ctx, &toolchain.formatter, &files, &mut ledger).await?;
    check_each_file(ctx, &toolchain.vet, &files, &mut ledger).await?;

    if !toolchain.analyzers.is_empty() {
        run_analyzers(ctx).await;
    }

    ctx.reporter.step("Checking license header...");
    ledger.begin_check("license header");
    let pattern = toolchain.license_regex()?;
    license::scan(
        ctx.workspace,
        &files,
        toolchain.license.header_lines,
        &pattern,
        &mut ledger,
    )?;

    ledger.into_result()
}

/// Run `template <file>` for every file; output or a non-zero exit is a
/// violation. A tool that could not run at all fails the pass outright.
async fn check_each_file(
    ctx: &PassContext<'_>,
    template: &CommandTemplate,
    files: &[PathBuf],
    ledger: &mut FailureLedger,
) -> Result<()> {
    let check = check_name(template);
    ctx.reporter.step(&format!("Checking {}...", check));
    ledger.begin_check(check.clone());

    for file in files {
        let subject = file.display().to_string();
        let spec = ctx.spec(template, format!("{} {}", check, subject)).arg(&subject);
        let result = ctx.invoker.run(&spec).await;
        if result.exit_code == -1 {
            return Err(GateError::SubprocessFailure {
                step: result.label,
                exit_code: result.exit_code,
            });
        }
        let output = result.combined_output();
        if !output.is_empty() {
            ledger.record(subject, output);
        } else if !result.passed() {
            ledger.record(subject, format!("exited with code {}", result.exit_code));
        }
    }
    Ok(())
}

async fn run_analyzers(ctx: &PassContext<'_>) {
    let packages = match packages::discover(ctx).await {
        Ok(packages) => packages,
        Err(e) => {
            ctx.reporter
                .best_effort(&BestEffortFailure::reported("package discovery", e.to_string()));
            return;
        }
    };

    for analyzer in &ctx.toolchain.analyzers {
        let name = analyzer.display_name().to_string();
        if !ctx.invoker.is_available(&ctx.spec(analyzer, name.as_str())) {
            ctx.reporter.best_effort(&BestEffortFailure::unavailable(&name));
            continue;
        }

        ctx.reporter.step(&format!("Checking {}...", name));
        let mut findings = Vec::new();
        for package in &packages {
            let spec = ctx.spec(analyzer, format!("{} {}", name, package)).arg(package);
            let result = ctx.invoker.run(&spec).await;
            let output = result.combined_output();
            if !output.is_empty() {
                findings.push(output);
            } else if !result.passed() {
                findings.push(format!("{}: exited with code {}", package, result.exit_code));
            }
        }
        if !findings.is_empty() {
            ctx.reporter
                .best_effort(&BestEffortFailure::reported(&name, findings.join("\n")));
        }
    }
}

/// `gofmt` for `gofmt -l`, `go vet` for `go vet`.
fn check_name(template: &CommandTemplate) -> String {
    match template.args.first() {
        Some(sub) if !sub.starts_with('-') => format!("{} {}", template.display_name(), sub),
        _ => template.display_name().to_string(),
    }
}
