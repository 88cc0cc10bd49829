//! File hashing collaborator
//!
//! The store never reads file contents itself. It hands paths to a
//! [`FileHasher`] from the worker, off the store lock, on tokio's blocking
//! pool. [`Sha1Hasher`] is the default implementation.

use crate::hash::FileHash;
use crate::{
    Result,
    error::{IoError, ValidationError},
};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read buffer size for streaming hashers
pub const DEFAULT_HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Output of a successful hash computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedFile {
    pub hash: FileHash,
    /// Number of bytes that went into the hash
    pub size: u64,
}

/// Computes the content hash of a file
///
/// Implementations are blocking and may take arbitrarily long.
pub trait FileHasher: Send + Sync {
    /// Hash the file at `path`
    fn hash_file(&self, path: &Path) -> Result<HashedFile>;

    /// Short name for log output
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Streaming SHA-1 file hasher
#[derive(Debug, Clone)]
pub struct Sha1Hasher {
    buffer_size: usize,
}

impl Sha1Hasher {
    /// Create a hasher with the default buffer size
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_HASH_BUFFER_SIZE,
        }
    }

    /// Create a hasher with a custom read buffer size
    pub fn with_buffer_size(buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(ValidationError::invalid_parameter(
                "buffer_size",
                "must be greater than 0",
            )
            .into());
        }
        Ok(Self { buffer_size })
    }

    /// Hash in-memory data
    pub fn hash_bytes(data: &[u8]) -> FileHash {
        FileHash::from_bytes(Sha1::digest(data).into())
    }
}

impl Default for Sha1Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHasher for Sha1Hasher {
    fn hash_file(&self, path: &Path) -> Result<HashedFile> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IoError::file_not_found(path),
            ErrorKind::PermissionDenied => IoError::permission_denied(path, e),
            _ => IoError::from_std(e).with_path(path),
        })?;

        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut size = 0u64;

        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(IoError::from_std(e).with_path(path).into()),
            };
            hasher.update(&buffer[..n]);
            size += n as u64;
        }

        Ok(HashedFile {
            hash: FileHash::from_bytes(hasher.finalize().into()),
            size,
        })
    }

    fn name(&self) -> &'static str {
        "sha1"
    }
}
