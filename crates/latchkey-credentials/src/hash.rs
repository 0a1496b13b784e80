//! Stored-credential comparison.
//!
//! Two record formats are understood:
//!
//! - `{SSHA}` followed by base64 of `sha1(secret || salt) || salt`
//! - anything else, compared as a plaintext value
//!
//! Both branches compare with [`subtle`] so the time taken does not depend
//! on where the first mismatching byte is.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use latchkey_core::{CredentialRecord, SSHA_PREFIX};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Length of a SHA-1 digest in bytes.
pub const SHA1_DIGEST_LENGTH: usize = 20;

/// Check a supplied secret against a stored credential record.
///
/// Returns `false` for an `{SSHA}` record whose body is not valid base64 or
/// is too short to hold a digest.
///
/// # Examples
///
/// ```
/// use latchkey_core::CredentialRecord;
/// use latchkey_credentials::compare;
///
/// let record = CredentialRecord::new("{SSHA}+rvziNkZ1S+q3I9Y4L7TlBR47kZOYUNsMTIzNA==");
/// assert!(compare(&record, "secret"));
/// assert!(!compare(&record, "wrong"));
///
/// assert!(compare(&CredentialRecord::new("abcd"), "abcd"));
/// ```
#[must_use]
pub fn compare(record: &CredentialRecord, supplied: &str) -> bool {
    match record.as_str().strip_prefix(SSHA_PREFIX) {
        Some(body) => compare_ssha(body, supplied),
        None => record
            .as_str()
            .as_bytes()
            .ct_eq(supplied.as_bytes())
            .into(),
    }
}

fn compare_ssha(body: &str, supplied: &str) -> bool {
    let Ok(decoded) = STANDARD.decode(body.trim()) else {
        return false;
    };
    if decoded.len() < SHA1_DIGEST_LENGTH {
        return false;
    }
    let (digest, salt) = decoded.split_at(SHA1_DIGEST_LENGTH);
    salted_digest(supplied, salt).as_slice().ct_eq(digest).into()
}

fn salted_digest(secret: &str, salt: &[u8]) -> [u8; SHA1_DIGEST_LENGTH] {
    let mut hasher = Sha1::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt);
    let mut digest = [0u8; SHA1_DIGEST_LENGTH];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Encode a secret as an `{SSHA}` record with the given salt.
///
/// Used to provision directory entries and backup secrets.
#[must_use]
pub fn encode_ssha(secret: &str, salt: &[u8]) -> CredentialRecord {
    let mut body = Vec::with_capacity(SHA1_DIGEST_LENGTH + salt.len());
    body.extend_from_slice(&salted_digest(secret, salt));
    body.extend_from_slice(salt);
    CredentialRecord::new(format!("{SSHA_PREFIX}{}", STANDARD.encode(body)))
}
