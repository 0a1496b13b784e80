//! Credential verification pipeline.
//!
//! ```text
//! lookup_user ──► Found(record)  ──► upsert cache ──► compare
//!             ├─► NotFound       ──► remove cache ──► backup secret? ──► compare
//!             └─► Failed / timeout ─► cached record? ─► backup secret? ─► compare
//! ```
//!
//! A failed lookup never touches the cache. Only an authoritative
//! `NotFound` revokes a cached entry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use latchkey_core::constants::DEFAULT_VERIFY_TIMEOUT_MS;
use latchkey_core::{AccessAttempt, CredentialRecord, UserId};
use latchkey_directory::{Directory, DirectoryError, Lookup};
use tracing::{debug, info, warn};

use crate::cache::CredentialCache;
use crate::hash::compare;

/// Where the credential used for a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Fresh from the directory.
    Directory,
    /// Cached copy, used because the directory could not be asked.
    Cache,
    /// Configured backup secret, used because no record exists.
    BackupSecret,
    /// Nothing to compare against.
    Missing,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Directory => "directory",
            Self::Cache => "cache",
            Self::BackupSecret => "backup_secret",
            Self::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// Outcome of one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the PIN matched.
    pub granted: bool,
    /// Which credential it was compared against.
    pub source: CredentialSource,
}

/// Checks access attempts against the directory, falling back to the cache.
#[derive(Debug)]
pub struct Verifier<D> {
    directory: Arc<D>,
    cache: Arc<CredentialCache>,
    backup_secret: Option<CredentialRecord>,
    lookup_timeout: Duration,
}

impl<D: Directory> Verifier<D> {
    /// Create a verifier with no backup secret and the default lookup
    /// timeout.
    pub fn new(directory: Arc<D>, cache: Arc<CredentialCache>) -> Self {
        Self {
            directory,
            cache,
            backup_secret: None,
            lookup_timeout: Duration::from_millis(DEFAULT_VERIFY_TIMEOUT_MS),
        }
    }

    /// Set the credential used when neither directory nor cache has a
    /// record. An empty secret disables the override.
    #[must_use]
    pub fn with_backup_secret(mut self, secret: Option<String>) -> Self {
        self.backup_secret = secret
            .filter(|s| !s.is_empty())
            .map(CredentialRecord::new);
        self
    }

    /// Bound on a single directory lookup.
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The cache this verifier reads and updates.
    pub fn cache(&self) -> &Arc<CredentialCache> {
        &self.cache
    }

    /// Returns `true` if the attempt's PIN matches the user's credential.
    pub async fn verify(&self, attempt: &AccessAttempt) -> bool {
        self.check(attempt).await.granted
    }

    /// Verify and report which credential the decision was based on.
    pub async fn check(&self, attempt: &AccessAttempt) -> Verdict {
        let user_id = attempt.user_id();
        let (record, source) = self.resolve(user_id).await;

        let granted = record
            .as_ref()
            .is_some_and(|record| compare(record, attempt.pin().as_str()));

        debug!(%user_id, %source, granted, "Credential compared");
        Verdict { granted, source }
    }

    async fn resolve(&self, user_id: &UserId) -> (Option<CredentialRecord>, CredentialSource) {
        let found = match self.lookup(user_id).await {
            Lookup::Found(record) => {
                self.cache.upsert(user_id.clone(), record.clone());
                Some((record, CredentialSource::Directory))
            }
            Lookup::NotFound => {
                if self.cache.remove(user_id).is_some() {
                    info!(%user_id, "User no longer in directory, cached credential revoked");
                }
                None
            }
            Lookup::Failed(e) => {
                warn!(
                    %user_id,
                    error = %e,
                    unreachable = e.is_connection_error(),
                    "Directory lookup failed, using cache"
                );
                self.cache
                    .get(user_id)
                    .map(|record| (record, CredentialSource::Cache))
            }
        };

        match (found, &self.backup_secret) {
            (Some((record, source)), _) => (Some(record), source),
            (None, Some(backup)) => (Some(backup.clone()), CredentialSource::BackupSecret),
            (None, None) => (None, CredentialSource::Missing),
        }
    }

    async fn lookup(&self, user_id: &UserId) -> Lookup {
        match tokio::time::timeout(self.lookup_timeout, self.directory.lookup_user(user_id)).await
        {
            Ok(lookup) => lookup,
            Err(_) => Lookup::Failed(DirectoryError::Timeout(
                self.lookup_timeout.as_millis() as u64,
            )),
        }
    }
}
