//! LDAP-backed [`Directory`].
//!
//! Each lookup opens a fresh connection, binds with the service account,
//! searches and unbinds. Lookups are rare (one per keypad accept plus one
//! bulk refresh per interval), so there is no pool.

use std::collections::HashMap;

use latchkey_core::{CredentialRecord, UserId};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::config::LdapConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::lookup::{Directory, DirectoryRecord, Lookup};

/// Parsed LDAP entry: DN plus text attributes.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Gets a single-valued attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

impl From<SearchEntry> for LdapEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}

/// Directory client over LDAP.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    config: LdapConfig,
}

impl LdapDirectory {
    /// Create a client after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Configuration` for an unusable config.
    pub fn new(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    async fn connect(&self) -> DirectoryResult<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.config.timeout());

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| DirectoryError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection driver error: {}", e);
            }
        });

        if let (Some(dn), Some(password)) = (&self.config.bind_dn, &self.config.bind_password) {
            ldap.with_timeout(self.config.timeout())
                .simple_bind(dn, password)
                .await
                .map_err(|e| DirectoryError::Bind(e.to_string()))?
                .success()
                .map_err(|e| DirectoryError::Bind(format!("bind rejected: {e}")))?;
        }

        Ok(ldap)
    }

    async fn search(&self, filter: &str) -> DirectoryResult<Vec<LdapEntry>> {
        let mut ldap = self.connect().await?;
        let attrs = vec![
            self.config.user_id_attribute.as_str(),
            self.config.credential_attribute.as_str(),
        ];

        let result = ldap
            .with_timeout(self.config.timeout())
            .search(&self.config.user_base, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| DirectoryError::search(e.to_string()))
            .and_then(|r| {
                r.success()
                    .map_err(|e| DirectoryError::search(format!("search rejected: {e}")))
            });

        if let Err(e) = ldap.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }

        let (entries, _res) = result?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from)
            .collect())
    }

    fn credential_of(&self, entry: &LdapEntry) -> DirectoryResult<CredentialRecord> {
        entry
            .get_attr(&self.config.credential_attribute)
            .map(CredentialRecord::new)
            .ok_or_else(|| {
                DirectoryError::malformed(format!(
                    "{} has no {}",
                    entry.dn, self.config.credential_attribute
                ))
            })
    }

    fn record_of(&self, entry: &LdapEntry) -> DirectoryResult<DirectoryRecord> {
        let raw_id = entry
            .get_attr(&self.config.user_id_attribute)
            .ok_or_else(|| {
                DirectoryError::malformed(format!(
                    "{} has no {}",
                    entry.dn, self.config.user_id_attribute
                ))
            })?;
        let user_id = UserId::new(raw_id)
            .map_err(|e| DirectoryError::malformed(format!("{}: {}", entry.dn, e)))?;
        Ok(DirectoryRecord {
            user_id,
            credential: self.credential_of(entry)?,
        })
    }
}

impl Directory for LdapDirectory {
    async fn lookup_user(&self, user_id: &UserId) -> Lookup {
        let filter = self.config.user_filter_for(user_id.as_str());
        debug!(%user_id, "Looking up user");

        let entries = match self.search(&filter).await {
            Ok(entries) => entries,
            Err(e) => return Lookup::Failed(e),
        };

        match entries.as_slice() {
            [] => Lookup::NotFound,
            [entry] => match self.credential_of(entry) {
                Ok(record) => Lookup::Found(record),
                Err(e) => Lookup::Failed(e),
            },
            many => Lookup::Failed(DirectoryError::Ambiguous {
                user_id: user_id.to_string(),
                count: many.len(),
            }),
        }
    }

    async fn lookup_authorized(&self) -> DirectoryResult<Vec<DirectoryRecord>> {
        let entries = self.search(&self.config.authorized_filter).await?;
        let total = entries.len();

        let records: Vec<DirectoryRecord> = entries
            .iter()
            .filter_map(|entry| match self.record_of(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping directory entry: {}", e);
                    None
                }
            })
            .collect();

        debug!(total, usable = records.len(), "Authorized users listed");
        Ok(records)
    }
}
