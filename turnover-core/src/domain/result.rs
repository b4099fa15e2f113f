//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Authentication, configuration, protocol, database and IO failures are
/// fatal for a run. `UnknownCurrencyVariant` and `Email` are caught at the
/// orchestrator's per-account boundary and never abort sibling accounts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Remote protocol error: {0}")]
    Protocol(String),

    #[error("Unknown currency variant: {0}")]
    UnknownCurrencyVariant(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a remote protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an email delivery error
    pub fn email(msg: impl Into<String>) -> Self {
        Self::Email(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
