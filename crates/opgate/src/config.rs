//! Run configuration sourced from the process environment.
//!
//! The environment is read exactly once, in [`RunConfiguration::from_env`].
//! Everything downstream receives a `&RunConfiguration`, so tests can build
//! synthetic configurations with [`RunConfiguration::from_pairs`].

use std::collections::BTreeMap;
use std::fmt;

/// Default test selector: run every test.
pub const MATCH_EVERYTHING: &str = ".*";

/// Configuration keys understood by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    /// Path to the kubeconfig used by end-to-end tests.
    Kubeconfig,

    /// Namespace the end-to-end tests run in.
    TestNamespace,

    /// Operator image built by `build` and exercised by e2e tiers.
    OperatorImage,

    /// Object-storage bucket used by backup/restore tests.
    TestS3Bucket,

    /// Secret holding object-storage credentials.
    TestAwsSecret,

    /// Test-name filter for e2e tiers.
    E2eTestSelector,

    /// Test-name filter for the upgrade tier.
    UpgradeTestSelector,

    /// Image the upgrade test starts from.
    UpgradeFrom,

    /// Image the upgrade test upgrades to.
    UpgradeTo,

    /// Whitespace-separated pass names to run.
    Passes,

    /// Whitespace-separated unit-test packages, overriding discovery.
    TestPackages,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::Kubeconfig,
        ConfigKey::TestNamespace,
        ConfigKey::OperatorImage,
        ConfigKey::TestS3Bucket,
        ConfigKey::TestAwsSecret,
        ConfigKey::E2eTestSelector,
        ConfigKey::UpgradeTestSelector,
        ConfigKey::UpgradeFrom,
        ConfigKey::UpgradeTo,
        ConfigKey::Passes,
        ConfigKey::TestPackages,
    ];

    /// Environment variable this key is read from.
    pub fn env_var(&self) -> &'static str {
        match self {
            ConfigKey::Kubeconfig => "KUBECONFIG",
            ConfigKey::TestNamespace => "TEST_NAMESPACE",
            ConfigKey::OperatorImage => "OPERATOR_IMAGE",
            ConfigKey::TestS3Bucket => "TEST_S3_BUCKET",
            ConfigKey::TestAwsSecret => "TEST_AWS_SECRET",
            ConfigKey::E2eTestSelector => "E2E_TEST_SELECTOR",
            ConfigKey::UpgradeTestSelector => "UPGRADE_TEST_SELECTOR",
            ConfigKey::UpgradeFrom => "UPGRADE_FROM",
            ConfigKey::UpgradeTo => "UPGRADE_TO",
            ConfigKey::Passes => "PASSES",
            ConfigKey::TestPackages => "TEST_PKGS",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Snapshot of every configuration value for one run.
///
/// Values are either present and non-empty, or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfiguration {
    values: BTreeMap<ConfigKey, String>,
}

impl RunConfiguration {
    /// Read every known key from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(
            ConfigKey::ALL
                .iter()
                .filter_map(|k| std::env::var(k.env_var()).ok().map(|v| (*k, v))),
        )
    }

    /// Build a configuration from explicit pairs. Empty values are dropped.
    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ConfigKey, V)>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key, value);
        }
        config
    }

    /// Set a value; an empty string removes the key.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: ConfigKey, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn is_set(&self, key: ConfigKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Whitespace-separated list value, empty when unset.
    pub fn list(&self, key: ConfigKey) -> Vec<String> {
        self.get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Present values, in key order, as environment variable pairs.
    pub fn env_pairs<'a>(
        &'a self,
        keys: &'a [ConfigKey],
    ) -> impl Iterator<Item = (&'static str, &'a str)> + 'a {
        keys.iter()
            .filter_map(move |k| self.get(*k).map(|v| (k.env_var(), v)))
    }
}
