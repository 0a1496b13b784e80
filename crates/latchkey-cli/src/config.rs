//! Controller configuration file.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [directory]
//! url = "ldaps://ldap.example.com"
//! bind_dn = "cn=door,ou=services,dc=example,dc=com"
//! bind_password = "..."
//! user_base = "ou=people,dc=example,dc=com"
//! user_filter = "(&(objectClass=posixAccount)(employeeNumber={}))"
//! authorized_filter = "(memberOf=cn=door,ou=groups,dc=example,dc=com)"
//! user_id_attribute = "employeeNumber"
//! credential_attribute = "doorPin"
//!
//! [access]
//! input_timeout_ms = 10000
//! refresh_interval_secs = 300
//! verify_timeout_ms = 3000
//! # backup_secret = "{SSHA}..."
//!
//! [feedback]
//! deny_blinks = 3
//! ```
//!
//! Only `[directory]` is required; every other section and field has a
//! default.

use std::path::Path;

use anyhow::{Context, bail};
use latchkey_directory::LdapConfig;
use latchkey_engine::{AccessConfig, FeedbackConfig};
use latchkey_hardware::SerialConfig;
use serde::{Deserialize, Serialize};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/latchkey/latchkey.toml";

/// Everything the controller reads at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Keypad serial link.
    #[serde(default)]
    pub serial: SerialConfig,

    /// LDAP directory.
    pub directory: LdapConfig,

    /// Access policy.
    #[serde(default)]
    pub access: AccessConfig,

    /// LED timings.
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

impl AppConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.serial.port.is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be greater than zero");
        }
        if self.serial.read_timeout_ms == 0 || self.serial.ack_timeout_ms == 0 {
            bail!("serial timeouts must be greater than zero");
        }
        self.directory.validate().context("directory")?;
        self.access.validate().context("access")?;
        Ok(())
    }

    /// One-line-per-section summary with secrets left out.
    pub fn summary(&self) -> String {
        format!(
            "serial: {} @ {} baud\n\
             directory: {} (base {}, bind {})\n\
             access: input timeout {}ms, refresh every {}s, verify timeout {}ms, backup secret {}\n\
             feedback: {} deny blinks of {}ms",
            self.serial.port,
            self.serial.baud_rate,
            self.directory.url,
            self.directory.user_base,
            self.directory.bind_dn.as_deref().unwrap_or("anonymous"),
            self.access.input_timeout_ms,
            self.access.refresh_interval_secs,
            self.access.verify_timeout_ms,
            if self
                .access
                .backup_secret
                .as_deref()
                .is_some_and(|secret| !secret.is_empty())
            {
                "set"
            } else {
                "unset"
            },
            self.feedback.deny_blinks,
            self.feedback.deny_blink_ms,
        )
    }
}
