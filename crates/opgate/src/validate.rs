//! Required-input checks performed before a pass spawns anything.

use tracing::error;

use crate::config::{ConfigKey, RunConfiguration};
use crate::error::{GateError, Result};
use crate::pass::PassName;

/// Fail with [`GateError::MissingConfiguration`] listing every absent key.
pub fn require(config: &RunConfiguration, pass: PassName, keys: &[ConfigKey]) -> Result<()> {
    let missing: Vec<ConfigKey> = keys
        .iter()
        .copied()
        .filter(|k| !config.is_set(*k))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    for key in &missing {
        error!(pass = %pass, key = %key, "Need to set {}", key.env_var());
    }
    Err(GateError::MissingConfiguration {
        pass,
        keys: missing,
    })
}
