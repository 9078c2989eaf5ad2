//! Error types for campaign-pulse-core

use thiserror::Error;

/// Main error type for the campaign-pulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure: timeout, DNS, refused connection, non-2xx status,
    /// or a broken event stream
    #[error("network error: {0}")]
    Network(String),

    /// Response body or stream event was not valid structured data
    #[error("parse error: {0}")]
    Parse(String),

    /// Campaign id has no matching record
    #[error("campaign not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl Error {
    /// True for failures the stream controller treats as a lost connection.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Result type alias for campaign-pulse-core
pub type Result<T> = std::result::Result<T, Error>;
