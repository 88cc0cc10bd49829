//! Cache records

use crate::hash::FileHash;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in one day, used to turn retention days into a window
pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Hash record for one file path
///
/// `hash` and `size` are trusted only while the file on disk still has the
/// recorded `size` and `mod_stamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub hash: FileHash,
    /// File size in bytes when it was hashed
    pub size: u64,
    /// File modification time (Unix seconds) when it was hashed
    pub mod_stamp: u64,
    /// Last successful validation (Unix seconds)
    pub last_access: u64,
}

impl CacheEntry {
    /// Whether the record still describes a file with this size and mtime
    pub fn matches(&self, size: u64, mod_time: u64) -> bool {
        self.size == size && self.mod_stamp == mod_time
    }

    /// Whether the record has gone unused for longer than `retention_secs` at `now`
    pub fn is_expired(&self, retention_secs: u64, now: u64) -> bool {
        self.last_access.saturating_add(retention_secs) < now
    }
}

/// Current time as Unix seconds
pub fn unix_now() -> u64 {
    to_unix_secs(SystemTime::now())
}

/// Convert a timestamp to Unix seconds, clamping pre-epoch times to zero
pub fn to_unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(last_access: u64) -> CacheEntry {
        CacheEntry {
            path: PathBuf::from("/a/f.txt"),
            hash: FileHash::from_bytes([1; 20]),
            size: 100,
            mod_stamp: 1000,
            last_access,
        }
    }

    #[test]
    fn test_matches_requires_exact_size_and_mtime() {
        let e = entry(0);
        assert!(e.matches(100, 1000));
        assert!(!e.matches(101, 1000));
        assert!(!e.matches(100, 1001));
        assert!(!e.matches(100, 999));
    }

    #[test]
    fn test_expiry_boundary() {
        let retention = 30 * SECONDS_PER_DAY;
        let now = 100 * SECONDS_PER_DAY;

        assert!(entry(now - 31 * SECONDS_PER_DAY).is_expired(retention, now));
        assert!(!entry(now - 29 * SECONDS_PER_DAY).is_expired(retention, now));
        // exactly at the edge is still retained
        assert!(!entry(now - retention).is_expired(retention, now));
    }

    #[test]
    fn test_expiry_does_not_overflow() {
        assert!(!entry(u64::MAX).is_expired(u64::MAX, u64::MAX));
    }

    #[test]
    fn test_unix_secs_conversion() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(to_unix_secs(t), 1_700_000_000);
        assert_eq!(to_unix_secs(UNIX_EPOCH - Duration::from_secs(5)), 0);
    }
}
