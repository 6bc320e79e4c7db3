//! End-to-end tiers (`e2e`, `e2eslow`, `e2esh`) and the `upgrade` test.
//!
//! Each tier is one package of cluster tests run through the warm-cache
//! double run. Cluster coordinates travel as test flags; object-storage
//! settings travel in the environment.

use crate::config::{ConfigKey, MATCH_EVERYTHING};
use crate::context::PassContext;
use crate::error::Result;
use crate::invoker::CommandSpec;
use crate::pass::PassName;

/// Configuration forwarded to every cluster test process.
const FORWARDED_ENV: [ConfigKey; 5] = [
    ConfigKey::Kubeconfig,
    ConfigKey::TestNamespace,
    ConfigKey::OperatorImage,
    ConfigKey::TestS3Bucket,
    ConfigKey::TestAwsSecret,
];

/// Run one of the plain e2e tiers.
pub async fn run_tier(ctx: &PassContext<'_>, pass: PassName) -> Result<()> {
    let tiers = &ctx.toolchain.tiers;
    let package = match pass {
        PassName::E2eSlow => &tiers.e2eslow,
        PassName::E2eSh => &tiers.e2esh,
        _ => &tiers.e2e,
    };
    let selector = ctx.config.get_or(ConfigKey::E2eTestSelector, MATCH_EVERYTHING);

    let mut flags = Vec::new();
    push_flag(&mut flags, "--kubeconfig", ctx.config.get(ConfigKey::Kubeconfig));
    push_flag(&mut flags, "--operator-image", ctx.config.get(ConfigKey::OperatorImage));
    push_flag(&mut flags, "--namespace", ctx.config.get(ConfigKey::TestNamespace));

    ctx.reporter
        .step(&format!("Running {} tests in {} (-run {})", pass, package, selector));
    ctx.retry()
        .run_twice(|warm| test_command(ctx, pass, package, selector, &flags, warm))
        .await?;
    Ok(())
}

/// Run the operator upgrade test from `UPGRADE_FROM` to `UPGRADE_TO`.
pub async fn run_upgrade(ctx: &PassContext<'_>) -> Result<()> {
    let package = &ctx.toolchain.tiers.upgrade;
    let selector = ctx
        .config
        .get_or(ConfigKey::UpgradeTestSelector, MATCH_EVERYTHING);

    let mut flags = Vec::new();
    push_flag(&mut flags, "--kubeconfig", ctx.config.get(ConfigKey::Kubeconfig));
    push_flag(&mut flags, "--kube-ns", ctx.config.get(ConfigKey::TestNamespace));
    push_flag(&mut flags, "--old-image", ctx.config.get(ConfigKey::UpgradeFrom));
    push_flag(&mut flags, "--new-image", ctx.config.get(ConfigKey::UpgradeTo));

    ctx.reporter.step(&format!(
        "Running upgrade tests in {} (-run {})",
        package, selector
    ));
    ctx.retry()
        .run_twice(|warm| {
            test_command(ctx, PassName::Upgrade, package, selector, &flags, warm)
        })
        .await?;
    Ok(())
}

fn push_flag(flags: &mut Vec<String>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        flags.push(format!("{}={}", name, value));
    }
}

fn test_command(
    ctx: &PassContext<'_>,
    pass: PassName,
    package: &str,
    selector: &str,
    flags: &[String],
    warm_cache: bool,
) -> CommandSpec {
    let runner = &ctx.toolchain.test;
    let mut spec = ctx.spec(&runner.command, format!("{} tests", pass));
    if warm_cache && !runner.warm_cache_flag.is_empty() {
        spec = spec.arg(&runner.warm_cache_flag);
    }
    spec = spec
        .arg(package)
        .args(["-run", selector, "-timeout", runner.timeout.as_str()]);
    if !runner.race_flag.is_empty() {
        spec = spec.arg(&runner.race_flag);
    }
    ctx.with_env(spec.args(flags.iter().cloned()), &FORWARDED_ENV)
}
