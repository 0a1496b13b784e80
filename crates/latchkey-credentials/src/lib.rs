//! Credential verification for the Latchkey door controller.
//!
//! - [`compare`]: salted-hash (`{SSHA}`) or plaintext comparison
//! - [`CredentialCache`]: last-known-good credentials, shared via `Arc`
//! - [`CacheRefresher`]: timer task that rebuilds the cache from the directory
//! - [`Verifier`]: directory lookup with cache fallback and backup secret
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use latchkey_core::{AccessAttempt, CredentialRecord, UserId};
//! use latchkey_credentials::{CredentialCache, Verifier};
//! use latchkey_directory::MockDirectory;
//!
//! #[tokio::main]
//! async fn main() {
//!     let directory = MockDirectory::new();
//!     directory.insert(UserId::new("1234").unwrap(), CredentialRecord::new("0000"));
//!
//!     let cache = Arc::new(CredentialCache::new());
//!     let verifier = Verifier::new(Arc::new(directory), Arc::clone(&cache));
//!
//!     let attempt = AccessAttempt::from_digits("12340000").unwrap();
//!     assert!(verifier.verify(&attempt).await);
//!     assert_eq!(cache.len(), 1);
//! }
//! ```

pub mod cache;
pub mod hash;
pub mod refresher;
pub mod verifier;

pub use cache::{CredentialCache, Revision};
pub use hash::{compare, encode_ssha};
pub use refresher::CacheRefresher;
pub use verifier::{CredentialSource, Verdict, Verifier};
