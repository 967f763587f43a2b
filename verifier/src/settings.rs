use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed reading settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed parsing settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Harness-level knobs, TOML-loadable with full defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds a scenario waits for any single expected callback.
    pub callback_timeout_secs: u64,
    /// RSA block width used by consent-hash recomputation.
    pub consent_block_bits: usize,
    /// Logger filters expression applied by the harness entrypoint.
    pub log_filters: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            callback_timeout_secs: 15,
            consent_block_bits: idnet_consent::DEFAULT_BLOCK_BITS,
            log_filters: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
    }
}
