//! Error types for tavla-core

use thiserror::Error;

/// Result type alias using tavla-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tavla-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No active network connection; raised before any network I/O is attempted
    #[error("Device is offline")]
    Offline,

    /// Network failure mid-call
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("HTTP error: status {status}")]
    Http {
        /// HTTP status code returned by the server
        status: u16,
    },

    /// Response body could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A sync pass for this account is already in flight
    #[error("Sync already running for account {0}")]
    SyncInProgress(i64),

    /// Local store rejected a write violating a uniqueness or foreign-key invariant
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<libsql::Error> for Error {
    fn from(error: libsql::Error) -> Self {
        let message = error.to_string();
        if message.contains("UNIQUE constraint failed")
            || message.contains("FOREIGN KEY constraint failed")
        {
            Self::Constraint(message)
        } else {
            Self::LibSql(error)
        }
    }
}

impl Error {
    /// Whether this error came from the transport layer (network, HTTP, decode).
    ///
    /// Transport failures abort the current sync scope without advancing its
    /// watermark; local store errors do not fall in this class.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Offline | Self::Transport(_) | Self::Http { .. } | Self::Deserialization(_)
        )
    }
}
