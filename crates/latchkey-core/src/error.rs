use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("Invalid access attempt: {0}")]
    InvalidAttempt(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
