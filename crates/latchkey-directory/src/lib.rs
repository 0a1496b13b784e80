//! Directory service access for the Latchkey door controller.
//!
//! The directory is the source of truth for who may open the door. Lookups
//! return a tagged [`Lookup`] so "the user does not exist" ([`Lookup::NotFound`])
//! can never be confused with "the directory could not be asked"
//! ([`Lookup::Failed`]).
//!
//! - [`LdapDirectory`]: production client over `ldap3`.
//! - [`MockDirectory`]: in-memory implementation with failure injection.

pub mod config;
pub mod error;
pub mod ldap;
pub mod lookup;
pub mod mock;

pub use config::LdapConfig;
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::{LdapDirectory, LdapEntry};
pub use lookup::{Directory, DirectoryRecord, Lookup};
pub use mock::MockDirectory;
