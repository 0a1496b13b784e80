//! Access policy settings.

use std::fmt;
use std::time::Duration;

use latchkey_core::constants::{
    DEFAULT_INPUT_TIMEOUT_MS, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_VERIFY_TIMEOUT_MS,
};
use latchkey_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Timeouts, refresh period and backup secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Gap between keys after which buffered digits are discarded.
    pub input_timeout_ms: u64,

    /// Period of the background cache refresh.
    pub refresh_interval_secs: u64,

    /// Bound on one directory lookup during verification.
    pub verify_timeout_ms: u64,

    /// Credential accepted for any user id the directory and cache both
    /// lack. Plaintext or `{SSHA}`.
    pub backup_secret: Option<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            input_timeout_ms: DEFAULT_INPUT_TIMEOUT_MS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            verify_timeout_ms: DEFAULT_VERIFY_TIMEOUT_MS,
            backup_secret: None,
        }
    }
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("input_timeout_ms", &self.input_timeout_ms)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("verify_timeout_ms", &self.verify_timeout_ms)
            .field(
                "backup_secret",
                &self.backup_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AccessConfig {
    /// Reject zero timeouts and intervals.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("input_timeout_ms", self.input_timeout_ms),
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("verify_timeout_ms", self.verify_timeout_ms),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }
}
