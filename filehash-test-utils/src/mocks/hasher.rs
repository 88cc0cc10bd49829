//! Scriptable hashing collaborator

use filehash_core::{
    Error, FileHash, FileHasher, HashedFile, Result, Sha1Hasher,
    error::{InternalError, IoError},
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Mock implementation of [`FileHasher`]
///
/// Unscripted paths hash to the SHA-1 of the path string with size 0.
/// Outcomes queued with the `fail_*` / `with_result` methods are consumed
/// in order; once a path's queue is empty its last successful result (or the
/// default) is returned.
///
/// ```rust,no_run
/// use filehash_test_utils::MockHasher;
/// use std::path::Path;
///
/// let hasher = MockHasher::new();
/// hasher.fail_retryable(Path::new("/flaky.bin"), 2);
/// hasher.with_result(Path::new("/flaky.bin"), [0xab; 20], 100);
/// ```
#[derive(Clone, Default)]
pub struct MockHasher {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    behavior: Mutex<Behavior>,
    gate: Mutex<bool>,
    gate_cv: Condvar,
}

#[derive(Default)]
struct Behavior {
    scripted: HashMap<PathBuf, VecDeque<Scripted>>,
    results: HashMap<PathBuf, HashedFile>,
    calls: HashMap<PathBuf, usize>,
    delay: Duration,
    running: usize,
    max_running: usize,
}

#[derive(Clone)]
enum Scripted {
    Ok(HashedFile),
    Retryable,
    Missing,
}

impl MockHasher {
    /// Create a mock with default behavior
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `hash`/`size` for `path`
    pub fn with_result(&self, path: &Path, hash: [u8; 20], size: u64) {
        let hashed = HashedFile {
            hash: FileHash::from_bytes(hash),
            size,
        };
        let mut behavior = self.inner.behavior.lock().unwrap();
        behavior
            .scripted
            .entry(path.to_path_buf())
            .or_default()
            .push_back(Scripted::Ok(hashed));
    }

    /// Fail the next `times` calls for `path` with a retryable error
    pub fn fail_retryable(&self, path: &Path, times: usize) {
        self.push_failures(path, times, Scripted::Retryable);
    }

    /// Fail the next call for `path` as if the file had vanished
    pub fn fail_missing(&self, path: &Path) {
        self.push_failures(path, 1, Scripted::Missing);
    }

    /// Sleep this long inside every call
    pub fn set_delay(&self, delay: Duration) {
        self.inner.behavior.lock().unwrap().delay = delay;
    }

    /// Block every call until [`release`](Self::release) is called
    pub fn hold(&self) {
        *self.inner.gate.lock().unwrap() = true;
    }

    /// Let held and future calls proceed
    pub fn release(&self) {
        *self.inner.gate.lock().unwrap() = false;
        self.inner.gate_cv.notify_all();
    }

    /// Number of calls made for `path`
    pub fn call_count(&self, path: &Path) -> usize {
        let behavior = self.inner.behavior.lock().unwrap();
        behavior.calls.get(path).copied().unwrap_or(0)
    }

    /// Number of calls across all paths
    pub fn total_calls(&self) -> usize {
        self.inner.behavior.lock().unwrap().calls.values().sum()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_concurrent_calls(&self) -> usize {
        self.inner.behavior.lock().unwrap().max_running
    }

    /// Number of calls running right now
    pub fn running_calls(&self) -> usize {
        self.inner.behavior.lock().unwrap().running
    }

    fn push_failures(&self, path: &Path, times: usize, failure: Scripted) {
        let mut behavior = self.inner.behavior.lock().unwrap();
        let queue = behavior.scripted.entry(path.to_path_buf()).or_default();
        for _ in 0..times {
            queue.push_back(failure.clone());
        }
    }

    fn wait_for_gate(&self) {
        let mut held = self.inner.gate.lock().unwrap();
        while *held {
            held = self.inner.gate_cv.wait(held).unwrap();
        }
    }
}

impl FileHasher for MockHasher {
    fn hash_file(&self, path: &Path) -> Result<HashedFile> {
        let (scripted, delay) = {
            let mut behavior = self.inner.behavior.lock().unwrap();
            *behavior.calls.entry(path.to_path_buf()).or_default() += 1;
            behavior.running += 1;
            behavior.max_running = behavior.max_running.max(behavior.running);
            let scripted = behavior
                .scripted
                .get_mut(path)
                .and_then(|queue| queue.pop_front());
            (scripted, behavior.delay)
        };

        self.wait_for_gate();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut behavior = self.inner.behavior.lock().unwrap();
        behavior.running -= 1;

        match scripted {
            Some(Scripted::Ok(hashed)) => {
                behavior.results.insert(path.to_path_buf(), hashed);
                Ok(hashed)
            }
            Some(Scripted::Retryable) => Err(Error::Internal(InternalError::hash_calculation(
                "mock",
                "scripted failure",
            ))),
            Some(Scripted::Missing) => Err(Error::Io(IoError::file_not_found(path))),
            None => Ok(behavior.results.get(path).copied().unwrap_or(HashedFile {
                hash: Sha1Hasher::hash_bytes(path.to_string_lossy().as_bytes()),
                size: 0,
            })),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
