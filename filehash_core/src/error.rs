//! Error types for the file hash cache
//!
//! Errors are grouped by where they come from: file system access, caller
//! input and configuration, and the store's own machinery.

use thiserror::Error;

pub mod internal;
pub mod io;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the file hash cache
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    /// Whether a hashing job that failed with this error is worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(io_err) => io_err.kind == IoErrorKind::Other,
            Self::Internal(internal) => internal.is_recoverable(),
            Self::Validation(_) => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(InternalError::cache_format(err.to_string()))
    }
}
