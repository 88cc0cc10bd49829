//! Internal library error types

use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Hash calculation error
    #[error("Hash calculation failed for algorithm '{algorithm}': {message}")]
    HashCalculation { algorithm: String, message: String },

    /// The store was shut down and accepts no more work
    #[error("Hash store has been shut down")]
    StoreShutDown,

    /// Background worker requested outside of a tokio runtime
    #[error("No tokio runtime available to run the hashing worker")]
    NoRuntime,

    /// Persisted cache could not be decoded
    #[error("Invalid cache file format: {message}")]
    CacheFormat { message: String },
}

impl InternalError {
    /// Create a hash calculation error
    pub fn hash_calculation(algorithm: &str, message: &str) -> Self {
        Self::HashCalculation {
            algorithm: algorithm.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a cache format error
    pub fn cache_format(message: impl Into<String>) -> Self {
        Self::CacheFormat {
            message: message.into(),
        }
    }

    /// Check if retrying the failed operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::HashCalculation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_calculation_error() {
        let error = InternalError::hash_calculation("SHA1", "Short read");
        assert!(error.to_string().contains("Hash calculation failed"));
        assert!(error.to_string().contains("SHA1"));
        assert!(error.to_string().contains("Short read"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_store_shut_down_error() {
        let error = InternalError::StoreShutDown;
        assert!(error.to_string().contains("shut down"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_cache_format_error() {
        let error = InternalError::cache_format("unsupported version 7");
        assert!(error.to_string().contains("Invalid cache file format"));
        assert!(error.to_string().contains("unsupported version 7"));
    }

    #[test]
    fn test_no_runtime_error() {
        let error = InternalError::NoRuntime;
        assert!(error.to_string().contains("tokio runtime"));
        assert!(!error.is_recoverable());
    }
}
