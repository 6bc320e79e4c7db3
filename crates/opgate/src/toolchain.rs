//! Collaborator command definitions.
//!
//! A [`Toolchain`] names every external tool a pass may invoke. The default
//! targets a Go operator checkout laid out with `hack/` scripts and
//! `test/e2e/` suites; a TOML file can override any subset of it.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::invoker::CommandSpec;

/// Program plus fixed leading arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve into a runnable spec rooted at `workspace`.
    pub fn to_spec(&self, label: impl Into<String>, workspace: &Path) -> CommandSpec {
        CommandSpec::new(label, &self.program)
            .args(self.args.iter().cloned())
            .current_dir(workspace)
    }

    /// Short name used in status lines.
    pub fn display_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }
}

/// Which files the per-file checks visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceRules {
    /// File extension without the dot.
    pub extension: String,

    /// Directory names skipped wherever they appear.
    pub excluded_dirs: Vec<String>,
}

impl Default for SourceRules {
    fn default() -> Self {
        Self {
            extension: "go".to_string(),
            excluded_dirs: vec![
                "vendor".to_string(),
                ".git".to_string(),
                "_output".to_string(),
            ],
        }
    }
}

/// License-header requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LicenseRule {
    /// How many leading lines are searched.
    pub header_lines: usize,

    /// Regex one of those lines must match.
    pub pattern: String,
}

impl Default for LicenseRule {
    fn default() -> Self {
        Self {
            header_lines: 3,
            pattern: "Copyright|generated|GENERATED".to_string(),
        }
    }
}

/// Sub-steps of the `build` pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildSteps {
    pub primary: CommandTemplate,
    pub auxiliary: Vec<CommandTemplate>,
    pub image_push: CommandTemplate,
}

impl Default for BuildSteps {
    fn default() -> Self {
        Self {
            primary: CommandTemplate::new("hack/build/operator/build", Vec::<String>::new()),
            auxiliary: vec![
                CommandTemplate::new("hack/build/backup-operator/build", Vec::<String>::new()),
                CommandTemplate::new("hack/build/restore-operator/build", Vec::<String>::new()),
            ],
            image_push: CommandTemplate::new("hack/build/docker_push", Vec::<String>::new()),
        }
    }
}

/// How to invoke the test runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestRunner {
    /// Runner program and subcommand, e.g. `go test`.
    pub command: CommandTemplate,

    /// Flag added only to the first of the two attempts.
    pub warm_cache_flag: String,

    /// Race-detector flag added to every attempt.
    pub race_flag: String,

    /// Per-invocation timeout handed to the runner.
    pub timeout: String,

    /// Coverage arguments for unit tests.
    pub coverage_args: Vec<String>,

    /// Flag that names the coverage fragment file (`<flag>=<path>`).
    pub coverage_profile_flag: String,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self {
            command: CommandTemplate::new("go", ["test"]),
            warm_cache_flag: "-i".to_string(),
            race_flag: "-race".to_string(),
            timeout: "30m".to_string(),
            coverage_args: vec!["-covermode=atomic".to_string()],
            coverage_profile_flag: "-coverprofile".to_string(),
        }
    }
}

/// Package path of each end-to-end tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestTiers {
    pub e2e: String,
    pub e2eslow: String,
    pub e2esh: String,
    pub upgrade: String,
}

impl Default for TestTiers {
    fn default() -> Self {
        Self {
            e2e: "./test/e2e/".to_string(),
            e2eslow: "./test/e2e/e2eslow".to_string(),
            e2esh: "./test/e2e/e2esh".to_string(),
            upgrade: "./test/e2e/upgradetest/".to_string(),
        }
    }
}

/// Unit-test package discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackageDiscovery {
    /// Prints one package per line.
    pub lister: CommandTemplate,

    /// Packages containing any of these substrings are dropped.
    pub exclude: Vec<String>,
}

impl Default for PackageDiscovery {
    fn default() -> Self {
        Self {
            lister: CommandTemplate::new("go", ["list", "./..."]),
            exclude: vec!["/test/e2e".to_string(), "/vendor/".to_string()],
        }
    }
}

/// Coverage artifact locations and upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoverageSettings {
    /// Combined report, relative to the workspace.
    pub report: PathBuf,

    /// Per-package fragment, relative to the workspace.
    pub fragment: PathBuf,

    /// Upload command; the report path is appended. `None` disables upload.
    pub upload: Option<CommandTemplate>,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            report: PathBuf::from("coverage.txt"),
            fragment: PathBuf::from("profile.out"),
            upload: Some(CommandTemplate::new("codecov", ["-f"])),
        }
    }
}

/// Every collaborator the passes invoke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Toolchain {
    pub sources: SourceRules,
    pub codegen_verify: CommandTemplate,
    pub formatter: CommandTemplate,
    pub vet: CommandTemplate,
    pub analyzers: Vec<CommandTemplate>,
    pub license: LicenseRule,
    pub build: BuildSteps,
    pub test: TestRunner,
    pub tiers: TestTiers,
    pub packages: PackageDiscovery,
    pub coverage: CoverageSettings,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            sources: SourceRules::default(),
            codegen_verify: CommandTemplate::new(
                "./hack/k8s/codegen/verify-generated.sh",
                Vec::<String>::new(),
            ),
            formatter: CommandTemplate::new("gofmt", ["-l", "-s", "-d"]),
            vet: CommandTemplate::new("go", ["vet"]),
            analyzers: vec![
                CommandTemplate::new("gosimple", Vec::<String>::new()),
                CommandTemplate::new("unused", Vec::<String>::new()),
            ],
            license: LicenseRule::default(),
            build: BuildSteps::default(),
            test: TestRunner::default(),
            tiers: TestTiers::default(),
            packages: PackageDiscovery::default(),
            coverage: CoverageSettings::default(),
        }
    }
}

impl Toolchain {
    /// Parse a TOML document; missing sections keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let toolchain: Toolchain =
            toml::from_str(text).map_err(|e| GateError::Toolchain(e.to_string()))?;
        toolchain.validate()?;
        Ok(toolchain)
    }

    /// Load and validate a TOML toolchain file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Compiled license-header regex.
    pub fn license_regex(&self) -> Result<Regex> {
        Regex::new(&self.license.pattern)
            .map_err(|e| GateError::Toolchain(format!("license pattern: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        self.license_regex()?;

        let mut templates = vec![
            ("codegen_verify", &self.codegen_verify),
            ("formatter", &self.formatter),
            ("vet", &self.vet),
            ("build.primary", &self.build.primary),
            ("build.image_push", &self.build.image_push),
            ("test.command", &self.test.command),
            ("packages.lister", &self.packages.lister),
        ];
        templates.extend(self.build.auxiliary.iter().map(|t| ("build.auxiliary", t)));
        templates.extend(self.analyzers.iter().map(|t| ("analyzers", t)));

        if let Some((field, _)) = templates.iter().find(|(_, t)| t.program.trim().is_empty()) {
            return Err(GateError::Toolchain(format!("{} has an empty program", field)));
        }
        if self.license.header_lines == 0 {
            return Err(GateError::Toolchain(
                "license.header_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toolchain_is_valid() {
        let toolchain = Toolchain::default();
        toolchain.validate().unwrap();
        assert_eq!(toolchain.build.auxiliary.len(), 2);
        assert_eq!(toolchain.coverage.report, PathBuf::from("coverage.txt"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toolchain = Toolchain::from_toml_str(
            r#"
            analyzers = []

            [sources]
            extension = "rs"

            [test]
            timeout = "10m"
            "#,
        )
        .unwrap();
        assert_eq!(toolchain.sources.extension, "rs");
        assert_eq!(toolchain.sources.excluded_dirs, SourceRules::default().excluded_dirs);
        assert_eq!(toolchain.test.timeout, "10m");
        assert_eq!(toolchain.test.warm_cache_flag, "-i");
        assert!(toolchain.analyzers.is_empty());
        assert_eq!(toolchain.formatter.program, "gofmt");
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = Toolchain::from_toml_str(
            r#"
            [formatter]
            program = ""
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("formatter"));
    }

    #[test]
    fn invalid_license_pattern_is_rejected() {
        let err = Toolchain::from_toml_str(
            r#"
            [license]
            pattern = "(unclosed"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GateError::Toolchain(_)));
    }

    #[test]
    fn template_resolves_into_spec() {
        let template = CommandTemplate::new("hack/build/operator/build", ["--fast"]);
        let spec = template.to_spec("build operator", Path::new("/src"));
        assert_eq!(spec.command_line(), "hack/build/operator/build --fast");
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/src")));
        assert_eq!(template.display_name(), "build");
    }
}
