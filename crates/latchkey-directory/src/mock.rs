//! In-memory [`Directory`] for tests and development.
//!
//! Clones share state, so a test can keep one clone to add/remove users or
//! break the "connection" while the code under test holds another.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use latchkey_core::{CredentialRecord, UserId};
use parking_lot::Mutex;

use crate::error::{DirectoryError, DirectoryResult};
use crate::lookup::{Directory, DirectoryRecord, Lookup};

#[derive(Debug, Default)]
struct MockState {
    users: BTreeMap<UserId, CredentialRecord>,
    failure: Option<DirectoryError>,
    delay: Option<Duration>,
    user_lookups: usize,
    bulk_lookups: usize,
}

/// Mock directory service.
///
/// # Examples
///
/// ```
/// use latchkey_core::{CredentialRecord, UserId};
/// use latchkey_directory::{Directory, DirectoryError, Lookup, MockDirectory};
///
/// #[tokio::main]
/// async fn main() {
///     let directory = MockDirectory::new();
///     let id = UserId::new("1234").unwrap();
///     directory.insert(id.clone(), CredentialRecord::new("0000"));
///
///     assert!(matches!(directory.lookup_user(&id).await, Lookup::Found(_)));
///
///     directory.fail_with(DirectoryError::connection("down"));
///     assert!(directory.lookup_user(&id).await.is_failed());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    /// Create an empty, healthy directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert(&self, user_id: UserId, credential: CredentialRecord) {
        self.state.lock().users.insert(user_id, credential);
    }

    /// Remove a user.
    pub fn remove(&self, user_id: &UserId) {
        self.state.lock().users.remove(user_id);
    }

    /// Make every lookup fail with `error` until [`recover`](Self::recover).
    pub fn fail_with(&self, error: DirectoryError) {
        self.state.lock().failure = Some(error);
    }

    /// Clear an injected failure.
    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Delay every lookup, to exercise timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Number of single-user lookups served or failed.
    pub fn user_lookups(&self) -> usize {
        self.state.lock().user_lookups
    }

    /// Number of bulk lookups served or failed.
    pub fn bulk_lookups(&self) -> usize {
        self.state.lock().bulk_lookups
    }

    async fn pause(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Directory for MockDirectory {
    async fn lookup_user(&self, user_id: &UserId) -> Lookup {
        self.pause().await;

        let mut state = self.state.lock();
        state.user_lookups += 1;
        if let Some(error) = &state.failure {
            return Lookup::Failed(error.clone());
        }
        let matches = state.users.get(user_id).cloned().into_iter().collect();
        Lookup::from_matches(user_id, matches)
    }

    async fn lookup_authorized(&self) -> DirectoryResult<Vec<DirectoryRecord>> {
        self.pause().await;

        let mut state = self.state.lock();
        state.bulk_lookups += 1;
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        Ok(state
            .users
            .iter()
            .map(|(user_id, credential)| DirectoryRecord {
                user_id: user_id.clone(),
                credential: credential.clone(),
            })
            .collect())
    }
}
