//! Core types shared by every Latchkey crate.
//!
//! Latchkey is a single-door access controller: a keypad peripheral on a
//! serial link delivers a 4-digit user id followed by a PIN, the credential
//! is checked against a directory (with a local cache as fallback), and the
//! door strike is pulsed on success.
//!
//! This crate holds the domain vocabulary ([`UserId`], [`Pin`],
//! [`CredentialRecord`], [`AccessAttempt`]), the wire and keypad
//! [`constants`], and the core [`Error`] type.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
