//! Builder for cache records

use filehash_core::{CacheEntry, FileHash, SECONDS_PER_DAY, Sha1Hasher, unix_now};
use std::path::PathBuf;

/// Builder for [`CacheEntry`] test fixtures
pub struct CacheEntryBuilder {
    path: PathBuf,
    hash: Option<FileHash>,
    size: u64,
    mod_stamp: u64,
    last_access: Option<u64>,
}

impl CacheEntryBuilder {
    /// Start a record for `path` (size 100, mtime 1000, accessed now)
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            hash: None,
            size: 100,
            mod_stamp: 1000,
            last_access: None,
        }
    }

    /// Set the hash from raw bytes
    pub fn with_hash(mut self, hash: [u8; 20]) -> Self {
        self.hash = Some(FileHash::from_bytes(hash));
        self
    }

    /// Set the recorded size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the recorded modification time
    pub fn with_mod_stamp(mut self, mod_stamp: u64) -> Self {
        self.mod_stamp = mod_stamp;
        self
    }

    /// Set the last access time (Unix seconds)
    pub fn accessed_at(mut self, last_access: u64) -> Self {
        self.last_access = Some(last_access);
        self
    }

    /// Set the last access to `days` days before now
    pub fn accessed_days_ago(self, days: u64) -> Self {
        self.accessed_at(unix_now().saturating_sub(days * SECONDS_PER_DAY))
    }

    /// Build the record; the hash defaults to the SHA-1 of the path
    pub fn build(self) -> CacheEntry {
        let hash = self
            .hash
            .unwrap_or_else(|| Sha1Hasher::hash_bytes(self.path.to_string_lossy().as_bytes()));
        CacheEntry {
            path: self.path,
            hash,
            size: self.size,
            mod_stamp: self.mod_stamp,
            last_access: self.last_access.unwrap_or_else(unix_now),
        }
    }
}
