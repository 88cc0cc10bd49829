//! File discovery for the `hash` command
//!
//! Expands the paths given on the command line into a sorted, de-duplicated
//! list of absolute file paths. Directories are walked one level deep, or
//! fully with `recursive`.

mod walker;

pub use walker::{FileDiscovery, FileDiscoveryOptions, discover_files};

use std::path::PathBuf;

/// Error type for file discovery operations
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Result type for file discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
