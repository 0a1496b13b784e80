//! In-memory credential cache.
//!
//! Shared between the access engine (single-key read, upsert, delete) and
//! the background refresher (wholesale replace). One `RwLock` guards the
//! whole map, so a bulk replace is a single swap that readers see either
//! entirely or not at all.
//!
//! A bulk replace carries the [`Revision`] read before its directory query
//! started. Users removed after that point stay removed, even if the
//! (older) bulk result still lists them.

use std::collections::HashMap;

use latchkey_core::{CredentialRecord, UserId};
use latchkey_directory::DirectoryRecord;
use parking_lot::RwLock;

/// Position in the cache's sequence of removals.
///
/// Obtained from [`CredentialCache::revision`] and handed back to
/// [`CredentialCache::replace_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Revision(u64);

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<UserId, CredentialRecord>,
    revision: u64,
    /// Removed users and the revision their removal created.
    revoked: HashMap<UserId, u64>,
}

/// Last-known-good credentials keyed by user id.
///
/// # Examples
///
/// ```
/// use latchkey_core::{CredentialRecord, UserId};
/// use latchkey_credentials::CredentialCache;
///
/// let cache = CredentialCache::new();
/// let id = UserId::new("1234").unwrap();
///
/// cache.upsert(id.clone(), CredentialRecord::new("0000"));
/// assert_eq!(cache.get(&id), Some(CredentialRecord::new("0000")));
///
/// cache.remove(&id);
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CredentialCache {
    inner: RwLock<Inner>,
}

impl CredentialCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached credential for a user, if any.
    pub fn get(&self, user_id: &UserId) -> Option<CredentialRecord> {
        self.inner.read().entries.get(user_id).cloned()
    }

    /// Returns `true` if the user has a cached credential.
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.inner.read().entries.contains_key(user_id)
    }

    /// Insert or overwrite one user's credential, returning the old one.
    ///
    /// Clears any pending revocation for the user.
    pub fn upsert(&self, user_id: UserId, record: CredentialRecord) -> Option<CredentialRecord> {
        let mut inner = self.inner.write();
        inner.revoked.remove(&user_id);
        inner.entries.insert(user_id, record)
    }

    /// Drop one user's credential, returning it if it was cached.
    ///
    /// The removal is recorded whether or not an entry existed, so an
    /// in-flight bulk replace cannot bring the user back.
    pub fn remove(&self, user_id: &UserId) -> Option<CredentialRecord> {
        let mut inner = self.inner.write();
        inner.revision += 1;
        let revision = inner.revision;
        inner.revoked.insert(user_id.clone(), revision);
        inner.entries.remove(user_id)
    }

    /// Current revision. Read this before querying the directory for a
    /// bulk replace.
    pub fn revision(&self) -> Revision {
        Revision(self.inner.read().revision)
    }

    /// Replace the entire contents with `records`.
    ///
    /// `since` is the revision read before `records` were fetched; users
    /// removed after it are skipped. Users missing from `records` are
    /// dropped. If a user id appears twice the last record wins. Returns
    /// the new entry count.
    pub fn replace_all<I>(&self, since: Revision, records: I) -> usize
    where
        I: IntoIterator<Item = DirectoryRecord>,
    {
        let mut fresh: HashMap<UserId, CredentialRecord> = records
            .into_iter()
            .map(|r| (r.user_id, r.credential))
            .collect();

        let mut inner = self.inner.write();
        fresh.retain(|user_id, _| {
            inner
                .revoked
                .get(user_id)
                .is_none_or(|&revoked_at| revoked_at <= since.0)
        });
        inner.revoked.retain(|_, revoked_at| *revoked_at > since.0);
        let count = fresh.len();
        inner.entries = fresh;
        count
    }

    /// Number of cached users.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Consistent copy of the current contents.
    pub fn snapshot(&self) -> HashMap<UserId, CredentialRecord> {
        self.inner.read().entries.clone()
    }
}
