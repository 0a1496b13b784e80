//! Directory lookup errors.
//!
//! Messages never carry bind credentials or stored PIN material.

use thiserror::Error;

/// Failures talking to the directory service.
///
/// Any of these means "could not check", never "user does not exist".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// Invalid configuration.
    #[error("Directory configuration error: {0}")]
    Configuration(String),

    /// Connection failed.
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// Service account bind failed.
    #[error("Directory bind failed: {0}")]
    Bind(String),

    /// Search operation failed.
    #[error("Directory search failed: {0}")]
    Search(String),

    /// An entry lacked a required attribute.
    #[error("Malformed directory entry: {0}")]
    MalformedEntry(String),

    /// A single-user lookup matched more than one entry.
    #[error("Lookup for {user_id} matched {count} entries")]
    Ambiguous { user_id: String, count: usize },

    /// The lookup did not finish in time.
    #[error("Directory lookup timed out after {0}ms")]
    Timeout(u64),
}

impl DirectoryError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a search error.
    #[must_use]
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Creates a malformed entry error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEntry(msg.into())
    }

    /// Checks if this is a transport-level failure.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Bind(_) | Self::Timeout(_))
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DirectoryError::connection("refused"), true)]
    #[case(DirectoryError::Bind("invalid credentials".to_string()), true)]
    #[case(DirectoryError::Timeout(3000), true)]
    #[case(DirectoryError::search("bad filter"), false)]
    #[case(DirectoryError::malformed("no pin"), false)]
    fn test_error_categories(#[case] err: DirectoryError, #[case] transport: bool) {
        assert_eq!(err.is_connection_error(), transport);
    }

    #[test]
    fn test_ambiguous_message() {
        let err = DirectoryError::Ambiguous {
            user_id: "1234".to_string(),
            count: 2,
        };
        assert_eq!(err.to_string(), "Lookup for 1234 matched 2 entries");
    }
}
