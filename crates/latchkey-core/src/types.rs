use crate::{
    Result,
    constants::{MAX_BUFFER_LENGTH, USER_ID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Prefix marking a salted SHA-1 credential record.
pub const SSHA_PREFIX: &str = "{SSHA}";

/// User identifier typed as the first digits on the keypad (4 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new user id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidUserId` unless the id is exactly
    /// [`USER_ID_LENGTH`] ASCII digits.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.len() != USER_ID_LENGTH || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidUserId(format!(
                "expected {USER_ID_LENGTH} digits, got {id:?}"
            )));
        }
        Ok(UserId(id.to_string()))
    }

    /// Get the user id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        UserId::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        UserId::new(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// PIN digits typed after the user id.
///
/// # Security
/// `Debug` never prints the digits and equality is constant-time.
#[derive(Clone, Eq)]
pub struct Pin(String);

impl Pin {
    /// Create a new PIN.
    ///
    /// # Errors
    /// Returns `Error::InvalidPin` if the PIN is empty or contains anything
    /// other than ASCII digits.
    pub fn new(pin: &str) -> Result<Self> {
        if pin.is_empty() {
            return Err(Error::InvalidPin("PIN must not be empty".to_string()));
        }
        if !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPin("PIN must be digits only".to_string()));
        }
        Ok(Pin(pin.to_string()))
    }

    /// Get the PIN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits in the PIN.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a PIN cannot be constructed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin(<{} digits>)", self.0.len())
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

/// Stored credential for one user.
///
/// Either a salted-hash encoding (`{SSHA}` + base64 of digest and salt) or a
/// plaintext value compared directly. The record is opaque to everything
/// except the comparator.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord(String);

impl CredentialRecord {
    /// Wrap a stored credential value.
    pub fn new(value: impl Into<String>) -> Self {
        CredentialRecord(value.into())
    }

    /// Get the raw stored value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the record uses the `{SSHA}` encoding.
    #[must_use]
    pub fn is_salted_hash(&self) -> bool {
        self.0.starts_with(SSHA_PREFIX)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_salted_hash() { "ssha" } else { "plain" };
        write!(f, "CredentialRecord({kind})")
    }
}

/// One (user id, PIN) pair taken from the keypad buffer on accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessAttempt {
    user_id: UserId,
    pin: Pin,
}

impl AccessAttempt {
    /// Build an attempt from its parts.
    pub fn new(user_id: UserId, pin: Pin) -> Self {
        Self { user_id, pin }
    }

    /// Split buffered keypad digits into user id and PIN.
    ///
    /// The first [`USER_ID_LENGTH`] digits are the user id, the rest is the
    /// PIN.
    ///
    /// # Errors
    /// Returns `Error::InvalidAttempt` if the buffer is not longer than the
    /// user id or exceeds [`MAX_BUFFER_LENGTH`], and the user id/PIN errors
    /// for non-digit content.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_core::AccessAttempt;
    ///
    /// let attempt = AccessAttempt::from_digits("12340000").unwrap();
    /// assert_eq!(attempt.user_id().as_str(), "1234");
    /// assert_eq!(attempt.pin().as_str(), "0000");
    ///
    /// assert!(AccessAttempt::from_digits("1234").is_err());
    /// ```
    pub fn from_digits(digits: &str) -> Result<Self> {
        if digits.len() <= USER_ID_LENGTH {
            return Err(Error::InvalidAttempt(format!(
                "need more than {USER_ID_LENGTH} digits, got {}",
                digits.len()
            )));
        }
        if digits.len() > MAX_BUFFER_LENGTH {
            return Err(Error::InvalidAttempt(format!(
                "at most {MAX_BUFFER_LENGTH} digits allowed, got {}",
                digits.len()
            )));
        }
        let (user_id, pin) = digits.split_at(USER_ID_LENGTH);
        Ok(Self::new(UserId::new(user_id)?, Pin::new(pin)?))
    }

    /// The claimed user id.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The supplied PIN.
    #[must_use]
    pub fn pin(&self) -> &Pin {
        &self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0000")]
    #[case("1234")]
    #[case(" 9876 ")]
    fn test_user_id_valid(#[case] input: &str) {
        let id = UserId::new(input).unwrap();
        assert_eq!(id.as_str(), input.trim());
    }

    #[rstest]
    #[case("")]
    #[case("123")]
    #[case("12345")]
    #[case("12a4")]
    #[case("jdoe")]
    fn test_user_id_invalid(#[case] input: &str) {
        assert!(matches!(UserId::new(input), Err(Error::InvalidUserId(_))));
    }

    #[test]
    fn test_user_id_serde_rejects_invalid() {
        let id: std::result::Result<UserId, _> = UserId::try_from("abc".to_string());
        assert!(id.is_err());
    }

    #[test]
    fn test_pin_debug_is_redacted() {
        let pin = Pin::new("4711").unwrap();
        let debug = format!("{pin:?}");
        assert!(!debug.contains("4711"));
        assert!(debug.contains("4 digits"));
    }

    #[test]
    fn test_pin_rejects_empty_and_non_digits() {
        assert!(Pin::new("").is_err());
        assert!(Pin::new("12a").is_err());
    }

    #[test]
    fn test_pin_equality() {
        assert_eq!(Pin::new("0000").unwrap(), Pin::new("0000").unwrap());
        assert_ne!(Pin::new("0000").unwrap(), Pin::new("0001").unwrap());
        assert_ne!(Pin::new("0000").unwrap(), Pin::new("00000").unwrap());
    }

    #[test]
    fn test_credential_record_kind() {
        assert!(CredentialRecord::new("{SSHA}abcd").is_salted_hash());
        assert!(!CredentialRecord::new("abcd").is_salted_hash());
        assert_eq!(
            format!("{:?}", CredentialRecord::new("secret")),
            "CredentialRecord(plain)"
        );
    }

    #[rstest]
    #[case("12345", "1234", "5")]
    #[case("12340000", "1234", "0000")]
    #[case("000099999999", "0000", "99999999")]
    fn test_attempt_split(#[case] digits: &str, #[case] user: &str, #[case] pin: &str) {
        let attempt = AccessAttempt::from_digits(digits).unwrap();
        assert_eq!(attempt.user_id().as_str(), user);
        assert_eq!(attempt.pin().as_str(), pin);
    }

    #[rstest]
    #[case("")]
    #[case("123")]
    #[case("1234")]
    fn test_attempt_too_short(#[case] digits: &str) {
        assert!(matches!(
            AccessAttempt::from_digits(digits),
            Err(Error::InvalidAttempt(_))
        ));
    }

    #[test]
    fn test_attempt_too_long() {
        let digits = "1".repeat(MAX_BUFFER_LENGTH + 1);
        assert!(AccessAttempt::from_digits(&digits).is_err());
    }
}
