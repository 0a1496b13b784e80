//! Directory client contract.

use std::future::Future;

use latchkey_core::{CredentialRecord, UserId};

use crate::error::{DirectoryError, DirectoryResult};

/// One authorized user as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Keypad user id.
    pub user_id: UserId,

    /// Stored credential for that user.
    pub credential: CredentialRecord,
}

/// Result of looking up a single user.
///
/// `NotFound` is an authoritative answer from a working directory;
/// `Failed` means the directory could not be asked. Callers must never
/// treat one as the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Exactly one entry matched.
    Found(CredentialRecord),

    /// The directory answered and nothing matched.
    NotFound,

    /// The directory could not answer.
    Failed(DirectoryError),
}

impl Lookup {
    /// Classify the entries returned by a single-user search.
    pub fn from_matches(user_id: &UserId, mut matches: Vec<CredentialRecord>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => Self::Found(matches.remove(0)),
            count => Self::Failed(DirectoryError::Ambiguous {
                user_id: user_id.to_string(),
                count,
            }),
        }
    }

    /// Returns `true` for an authoritative "no such user" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` if the directory could not be asked.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Source of truth for user credentials.
///
/// Methods return `impl Future + Send` so a `Directory` can be shared with
/// the background refresh task.
pub trait Directory: Send + Sync {
    /// Look up one user by keypad id.
    fn lookup_user(&self, user_id: &UserId) -> impl Future<Output = Lookup> + Send;

    /// List every user currently authorized to open the door.
    fn lookup_authorized(&self)
    -> impl Future<Output = DirectoryResult<Vec<DirectoryRecord>>> + Send;
}
