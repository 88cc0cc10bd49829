//! Result delivery for asynchronous hash requests

use crate::Error;
use crate::hash::FileHash;
use std::path::Path;

/// Caller-supplied correlation value, handed back unchanged in callbacks
pub type RequestToken = u64;

/// Receiver of completed hash jobs
///
/// Callbacks run on the store's worker, never on the thread that issued the
/// request, so implementations must synchronize their own state.
pub trait HashClient: Send + Sync {
    /// Called exactly once for every job that hashed successfully
    fn hash_computed(&self, token: RequestToken, path: &Path, hash: FileHash, size: u64);

    /// Called once when a job is dropped after its last failed attempt
    fn hash_failed(&self, token: RequestToken, path: &Path, error: &Error) {
        let _ = (token, path, error);
    }
}

/// Client that discards every result
///
/// Useful to warm the cache without waiting on anything.
pub struct NullClient;

impl HashClient for NullClient {
    fn hash_computed(&self, _token: RequestToken, _path: &Path, _hash: FileHash, _size: u64) {}
}
