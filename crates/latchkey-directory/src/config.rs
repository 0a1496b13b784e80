//! LDAP directory configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Placeholder in `user_filter` replaced by the escaped user id.
pub const USER_ID_PLACEHOLDER: &str = "{}";

/// LDAP connection, search and attribute-mapping settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    /// Server URL (`ldap://`, `ldaps://` or `ldapi://`).
    pub url: String,

    /// Service account DN. Anonymous bind when unset.
    pub bind_dn: Option<String>,

    /// Service account password.
    pub bind_password: Option<String>,

    /// Search base for user entries.
    pub user_base: String,

    /// Filter for one user; must contain `{}` for the user id.
    pub user_filter: String,

    /// Filter selecting everyone allowed through the door.
    pub authorized_filter: String,

    /// Attribute holding the keypad user id.
    pub user_id_attribute: String,

    /// Attribute holding the stored credential.
    pub credential_attribute: String,

    /// Connect and per-operation timeout.
    pub timeout_ms: u64,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bind_dn: None,
            bind_password: None,
            user_base: String::new(),
            user_filter: "(uid={})".to_string(),
            authorized_filter: "(objectClass=posixAccount)".to_string(),
            user_id_attribute: "uid".to_string(),
            credential_attribute: "userPassword".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "<redacted>"))
            .field("user_base", &self.user_base)
            .field("user_filter", &self.user_filter)
            .field("authorized_filter", &self.authorized_filter)
            .field("user_id_attribute", &self.user_id_attribute)
            .field("credential_attribute", &self.credential_attribute)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl LdapConfig {
    /// Check the configuration for mistakes that would only surface at
    /// lookup time.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Configuration` describing the first problem.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.url.is_empty() {
            return Err(DirectoryError::Configuration("url is required".to_string()));
        }
        if !["ldap://", "ldaps://", "ldapi://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(DirectoryError::Configuration(format!(
                "unsupported url scheme: {}",
                self.url
            )));
        }
        if !self.user_filter.contains(USER_ID_PLACEHOLDER) {
            return Err(DirectoryError::Configuration(
                "user_filter must contain {} for the user id".to_string(),
            ));
        }
        if self.bind_dn.is_some() != self.bind_password.is_some() {
            return Err(DirectoryError::Configuration(
                "bind_dn and bind_password must be set together".to_string(),
            ));
        }
        if self.user_id_attribute.is_empty() || self.credential_attribute.is_empty() {
            return Err(DirectoryError::Configuration(
                "attribute names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Single-user filter with the id LDAP-escaped.
    pub fn user_filter_for(&self, user_id: &str) -> String {
        self.user_filter
            .replace(USER_ID_PLACEHOLDER, &ldap3::ldap_escape(user_id))
    }

    /// Operation timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
