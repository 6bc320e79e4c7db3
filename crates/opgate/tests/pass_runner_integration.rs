//! Integration tests for pass ordering, required inputs and lint ledgers,
//! driven through `ScriptedInvoker`.

use std::path::Path;

use opgate::fakes::ScriptedInvoker;
use opgate::reporter::CapturedOutput;
use opgate::toolchain::CommandTemplate;
use opgate::{
    ConfigKey, GateError, Invoker, PassContext, PassName, PassRunner, PassState, PipelineResult,
    Reporter, RunConfiguration, SystemInvoker, Toolchain, EXIT_POLICY_VIOLATION,
};
use tempfile::TempDir;

const LICENSED: &str = "// Copyright 2017 The etcd-operator Authors\n\npackage x\n";

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

async fn execute(
    dir: &Path,
    config: &RunConfiguration,
    invoker: &ScriptedInvoker,
    passes: &[PassName],
) -> (PipelineResult, CapturedOutput) {
    execute_with(dir, config, &Toolchain::default(), invoker, passes).await
}

async fn execute_with(
    dir: &Path,
    config: &RunConfiguration,
    toolchain: &Toolchain,
    invoker: &dyn Invoker,
    passes: &[PassName],
) -> (PipelineResult, CapturedOutput) {
    let (reporter, out) = Reporter::captured();
    let runner = PassRunner::new(PassContext {
        config,
        toolchain,
        invoker,
        reporter: &reporter,
        workspace: dir,
    });
    let result = runner.execute(passes).await;
    reporter.finish(&result);
    (result, out)
}

fn full_config() -> RunConfiguration {
    RunConfiguration::from_pairs([
        (ConfigKey::OperatorImage, "quay.io/coreos/etcd-operator:test"),
        (ConfigKey::TestS3Bucket, "etcd-backups"),
        (ConfigKey::TestAwsSecret, "aws-secret"),
        (ConfigKey::TestNamespace, "e2e-1234"),
        (ConfigKey::Kubeconfig, "/root/.kube/config"),
        (ConfigKey::TestPackages, "./pkg/util"),
        (ConfigKey::UpgradeFrom, "quay.io/coreos/etcd-operator:v0.9.0"),
        (ConfigKey::UpgradeTo, "quay.io/coreos/etcd-operator:test"),
    ])
}

/// Scenario: a file without a license header fails `fmt` with 255 and is named.
#[tokio::test]
async fn test_missing_license_header_is_policy_violation() {
    let dir = workspace(&[("cmd/operator/main.go", LICENSED), ("pkg/util/util.go", "package util\n")]);
    let invoker = ScriptedInvoker::new();

    let (result, out) = execute(
        dir.path(),
        &RunConfiguration::default(),
        &invoker,
        &[PassName::Fmt],
    )
    .await;

    assert!(!result.success());
    assert_eq!(result.exit_code(), EXIT_POLICY_VIOLATION);
    let failure = result.failure.as_ref().unwrap();
    match &failure.error {
        GateError::PolicyViolation(ledger) => {
            assert_eq!(ledger.len(), 1);
            assert_eq!(ledger.entries()[0].subject, "pkg/util/util.go");
        }
        other => panic!("unexpected error: {other}"),
    }
    let text = out.contents();
    assert!(text.contains("license header checking failed:"));
    assert!(text.contains("pkg/util/util.go"));
}

/// Lint checks scan every file before failing.
#[tokio::test]
async fn test_lint_violations_are_collected_across_files_and_checks() {
    let dir = workspace(&[
        ("pkg/a.go", LICENSED),
        ("pkg/b.go", LICENSED),
        ("pkg/c.go", "package pkg\n"),
    ]);
    let invoker = ScriptedInvoker::new()
        .stdout_on("gofmt -l -s -d pkg/a.go", "diff pkg/a.go\n-x\n+y\n")
        .stdout_on("gofmt -l -s -d pkg/b.go", "diff pkg/b.go\n")
        .stderr_on("go vet pkg/b.go", "pkg/b.go:3: unreachable code\n")
        .fail_on("go vet pkg/b.go", 1);

    let (result, out) = execute(
        dir.path(),
        &RunConfiguration::default(),
        &invoker,
        &[PassName::Fmt],
    )
    .await;

    assert_eq!(result.exit_code(), EXIT_POLICY_VIOLATION);
    // Every file went through both per-file checks.
    assert_eq!(invoker.calls_matching("gofmt").len(), 3);
    assert_eq!(invoker.calls_matching("go vet").len(), 3);

    let ledger = match &result.failure.as_ref().unwrap().error {
        GateError::PolicyViolation(ledger) => ledger.clone(),
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(ledger.failed_checks(), vec!["gofmt", "go vet", "license header"]);
    assert_eq!(ledger.len(), 4);

    let text = out.contents();
    assert!(text.contains("gofmt checking failed:"));
    assert!(text.contains("unreachable code"));
    assert!(text.contains("pkg/c.go"));
}

/// Generated-code verification is a hard gate with the generic exit code.
#[tokio::test]
async fn test_codegen_failure_is_generic_failure() {
    let dir = workspace(&[("pkg/a.go", LICENSED)]);
    let invoker = ScriptedInvoker::new().fail_on("verify-generated.sh", 1);

    let (result, _) = execute(
        dir.path(),
        &RunConfiguration::default(),
        &invoker,
        &[PassName::Fmt],
    )
    .await;

    assert_eq!(result.exit_code(), 1);
    assert!(invoker.calls_matching("gofmt").is_empty());
}

/// Optional analyzers never fail the pass.
#[tokio::test]
async fn test_best_effort_analyzers_do_not_fail_fmt() {
    let dir = workspace(&[("pkg/a.go", LICENSED)]);
    let invoker = ScriptedInvoker::new()
        .unavailable("gosimple")
        .stdout_on("unused ./pkg/util", "pkg/util/x.go:4:2: var y is unused\n")
        .fail_on("unused ./pkg/util", 1);

    let (result, out) = execute(dir.path(), &full_config(), &invoker, &[PassName::Fmt]).await;

    assert!(result.success(), "analyzer findings must be ignored");
    assert!(invoker.calls_matching("gosimple").is_empty());
    assert_eq!(invoker.calls_matching("unused").len(), 1);
    let text = out.contents();
    assert!(text.contains("Skipping gosimple: not installed"));
    assert!(text.contains("unused reported issues (ignored)"));
    assert!(text.contains("test success ==="));
}

/// Scenario: `e2e` without the bucket stops before any tool runs.
#[tokio::test]
async fn test_missing_bucket_stops_before_invoking_anything() {
    let dir = workspace(&[]);
    let config = RunConfiguration::from_pairs([(ConfigKey::TestAwsSecret, "aws-secret")]);
    let invoker = ScriptedInvoker::new();

    let (result, out) = execute(dir.path(), &config, &invoker, &[PassName::E2e]).await;

    let failure = result.failure.as_ref().expect("e2e should fail");
    match &failure.error {
        GateError::MissingConfiguration { pass, keys } => {
            assert_eq!(*pass, PassName::E2e);
            assert_eq!(keys, &vec![ConfigKey::TestS3Bucket]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(result.exit_code(), 1);
    assert!(invoker.calls().is_empty(), "no tool may run");
    assert!(out.contents().contains("TEST_S3_BUCKET"));
}

/// A formatter that cannot be started is a tool failure, not a lint finding.
#[tokio::test]
async fn test_unrunnable_formatter_is_generic_failure() {
    let dir = workspace(&[("pkg/util/util.go", LICENSED)]);
    let mut toolchain = Toolchain::default();
    toolchain.codegen_verify = CommandTemplate::new("true", Vec::<String>::new());
    toolchain.formatter = CommandTemplate::new("opgate-no-such-gofmt", ["-l"]);
    toolchain.analyzers.clear();

    let (result, _) = execute_with(
        dir.path(),
        &RunConfiguration::default(),
        &toolchain,
        &SystemInvoker::quiet(),
        &[PassName::Fmt],
    )
    .await;

    assert_eq!(result.exit_code(), 1);
    assert!(matches!(
        result.failure.as_ref().map(|f| &f.error),
        Some(GateError::SubprocessFailure { exit_code: -1, .. })
    ));
}

#[tokio::test]
async fn test_spawn_failure_during_vet_stops_fmt() {
    let dir = workspace(&[("pkg/a.go", LICENSED), ("pkg/b.go", LICENSED)]);
    let invoker = ScriptedInvoker::new().fail_on("go vet pkg/a.go", -1);

    let (result, _) = execute(
        dir.path(),
        &RunConfiguration::default(),
        &invoker,
        &[PassName::Fmt],
    )
    .await;

    assert_eq!(result.exit_code(), 1);
    assert!(invoker.calls_matching("go vet pkg/b.go").is_empty());
}

/// `build` and the slower e2e tiers check their inputs before spawning.
#[tokio::test]
async fn test_build_and_e2e_tiers_require_inputs() {
    let dir = workspace(&[]);
    let cases = [
        (PassName::Build, vec![ConfigKey::OperatorImage]),
        (
            PassName::E2eSlow,
            vec![ConfigKey::TestS3Bucket, ConfigKey::TestAwsSecret],
        ),
        (
            PassName::E2eSh,
            vec![ConfigKey::TestS3Bucket, ConfigKey::TestAwsSecret],
        ),
    ];

    for (pass, missing) in cases {
        let invoker = ScriptedInvoker::new();
        let (result, out) =
            execute(dir.path(), &RunConfiguration::default(), &invoker, &[pass]).await;

        match &result.failure.as_ref().expect("pass should fail").error {
            GateError::MissingConfiguration { pass: failed, keys } => {
                assert_eq!(*failed, pass);
                assert_eq!(keys, &missing);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(result.exit_code(), 1);
        assert!(invoker.calls().is_empty(), "{pass} must not run anything");
        assert!(out.contents().contains(&format!("{pass} pass not started")));
    }
}

#[tokio::test]
async fn test_upgrade_requires_both_images() {
    let dir = workspace(&[]);
    let config = RunConfiguration::from_pairs([(ConfigKey::UpgradeFrom, "img:v1")]);
    let invoker = ScriptedInvoker::new();

    let (result, _) = execute(dir.path(), &config, &invoker, &[PassName::Upgrade]).await;

    assert!(matches!(
        result.failure.as_ref().map(|f| &f.error),
        Some(GateError::MissingConfiguration { .. })
    ));
    assert!(invoker.calls().is_empty());
}

/// Scenario: a failing `build` means `fmt` is never attempted.
#[tokio::test]
async fn test_failed_pass_stops_the_run() {
    let dir = workspace(&[("pkg/a.go", LICENSED)]);
    let invoker = ScriptedInvoker::new().fail_on("hack/build/operator/build", 2);

    let (result, out) = execute(
        dir.path(),
        &full_config(),
        &invoker,
        &[PassName::Build, PassName::Fmt],
    )
    .await;

    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.attempted(), vec![PassName::Build]);
    assert_eq!(result.records[1].state, PassState::NotStarted);
    assert_eq!(invoker.command_lines(), vec!["hack/build/operator/build"]);
    assert!(out.contents().contains("- fmt (not attempted)"));
}

#[tokio::test]
async fn test_build_runs_all_steps_with_image() {
    let dir = workspace(&[]);
    let invoker = ScriptedInvoker::new();

    let (result, _) = execute(dir.path(), &full_config(), &invoker, &[PassName::Build]).await;

    assert!(result.success());
    assert_eq!(
        invoker.command_lines(),
        vec![
            "hack/build/operator/build",
            "hack/build/backup-operator/build",
            "hack/build/restore-operator/build",
            "hack/build/docker_push",
        ]
    );
    for call in invoker.calls() {
        assert_eq!(
            call.env.get("IMAGE").map(String::as_str),
            Some("quay.io/coreos/etcd-operator:test")
        );
    }
}

/// Passes run in the requested order, not declaration order.
#[tokio::test]
async fn test_passes_run_in_requested_order() {
    let dir = workspace(&[]);
    let invoker = ScriptedInvoker::new();

    let (result, out) = execute(
        dir.path(),
        &full_config(),
        &invoker,
        &[PassName::Unit, PassName::E2eSlow, PassName::Build],
    )
    .await;

    assert!(result.success());
    assert_eq!(
        result.attempted(),
        vec![PassName::Unit, PassName::E2eSlow, PassName::Build]
    );

    let lines = invoker.command_lines();
    let first_unit = lines.iter().position(|l| l.contains("./pkg/util")).unwrap();
    let first_e2e = lines.iter().position(|l| l.contains("e2eslow")).unwrap();
    let first_build = lines.iter().position(|l| l.contains("hack/build")).unwrap();
    assert!(first_unit < first_e2e && first_e2e < first_build);
    assert!(out.contents().trim_end().ends_with("test success ==="));
}

#[tokio::test]
async fn test_e2e_tier_double_run_and_forwarded_config() {
    let dir = workspace(&[]);
    let invoker = ScriptedInvoker::new();

    let (result, _) = execute(dir.path(), &full_config(), &invoker, &[PassName::E2e]).await;

    assert!(result.success());
    let calls = invoker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].command_line(),
        "go test -i ./test/e2e/ -run .* -timeout 30m -race \
         --kubeconfig=/root/.kube/config \
         --operator-image=quay.io/coreos/etcd-operator:test --namespace=e2e-1234"
    );
    assert!(!calls[1].args.contains(&"-i".to_string()));
    assert_eq!(
        calls[1].env.get("TEST_S3_BUCKET").map(String::as_str),
        Some("etcd-backups")
    );
    assert_eq!(
        calls[1].env.get("TEST_AWS_SECRET").map(String::as_str),
        Some("aws-secret")
    );
}

#[tokio::test]
async fn test_e2e_selector_and_failure_on_second_attempt() {
    let dir = workspace(&[]);
    let mut config = full_config();
    config.set(ConfigKey::E2eTestSelector, "TestCreateCluster");
    let invoker = ScriptedInvoker::new().fail_on("go test ./test/e2e/e2esh", 1);

    let (result, _) = execute(dir.path(), &config, &invoker, &[PassName::E2eSh]).await;

    assert_eq!(result.exit_code(), 1);
    let lines = invoker.command_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.contains("-run TestCreateCluster")));
}

#[tokio::test]
async fn test_upgrade_passes_image_flags() {
    let dir = workspace(&[]);
    let invoker = ScriptedInvoker::new();

    let (result, _) = execute(dir.path(), &full_config(), &invoker, &[PassName::Upgrade]).await;

    assert!(result.success());
    let line = &invoker.command_lines()[1];
    assert!(line.starts_with("go test ./test/e2e/upgradetest/"));
    assert!(line.contains("--kube-ns=e2e-1234"));
    assert!(line.contains("--old-image=quay.io/coreos/etcd-operator:v0.9.0"));
    assert!(line.contains("--new-image=quay.io/coreos/etcd-operator:test"));
}
