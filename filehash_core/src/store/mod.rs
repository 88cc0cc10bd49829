//! The hash store: validated-hash table, pending job queue and worker
//!
//! # Lookup
//!
//! [`HashStore::request_hash`] compares the caller's current file size and
//! modification time against the cached record. An exact match answers
//! immediately. Anything else queues a hashing job (at most one per path) and
//! the result arrives later through the caller's [`HashClient`].
//!
//! # Worker
//!
//! Jobs are hashed one at a time. The worker is a small state machine,
//! `Idle -> Running` when a job is queued and `Running -> Idle` when a tick
//! finds the queue empty, with both transitions made under the same lock
//! that guards the maps. See [`HashStore::tick`].
//!
//! # Eviction
//!
//! [`HashStore::clean`] drops records whose last validation is older than the
//! retention window. It is meant to run from a maintenance timer, not per
//! request.

mod config;
mod worker;

pub use config::{HashStoreConfig, WorkerMode};
pub use worker::{JobOutcome, Tick};

use crate::client::{HashClient, RequestToken};
use crate::entry::{CacheEntry, unix_now};
use crate::hash::FileHash;
use crate::hashing::{FileHasher, Sha1Hasher};
use crate::{Result, error::InternalError};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Notify;

/// Answer to a hash request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The cached hash is still valid for the given size and mtime
    Valid(FileHash),
    /// The hash is being (re)computed; the client will be called back
    Pending,
}

impl Lookup {
    /// Whether the lookup was answered from the cache
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The cached hash, if valid
    pub fn hash(&self) -> Option<FileHash> {
        match self {
            Self::Valid(hash) => Some(*hash),
            Self::Pending => None,
        }
    }
}

/// Lifecycle of the background worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
}

/// Counters describing store activity since construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entry_count: usize,
    pub pending_count: usize,
    /// Sum of the sizes of all cached files
    pub total_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    /// Misses that joined an already queued job
    pub coalesced_count: u64,
    pub hashed_count: u64,
    pub retry_count: u64,
    pub failed_count: u64,
    pub evicted_count: u64,
}

/// A queued hashing request
struct PendingJob {
    id: u64,
    client: Arc<dyn HashClient>,
    token: RequestToken,
    mod_time: u64,
    attempts: u32,
    retry_at: Option<Instant>,
    in_flight: bool,
}

struct StoreState {
    entries: HashMap<PathBuf, CacheEntry>,
    // ordered so the worker picks jobs deterministically
    jobs: BTreeMap<PathBuf, PendingJob>,
    worker: WorkerState,
    changed: bool,
    next_job_id: u64,
    stats: StoreStats,
}

/// File hash cache with a serialized background hashing worker
///
/// Construct with [`HashStore::new`] or [`HashStore::with_hasher`] and share
/// the returned `Arc`. All methods take `&self` and may be called from any
/// thread; none of them block on file I/O.
pub struct HashStore {
    state: Mutex<StoreState>,
    hasher: Arc<dyn FileHasher>,
    config: HashStoreConfig,
    runtime: Option<Handle>,
    shutdown: AtomicBool,
    wake: Notify,
}

impl std::fmt::Debug for HashStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("HashStore")
            .field("hasher", &self.hasher.name())
            .field("entries", &state.entries.len())
            .field("pending", &state.jobs.len())
            .field("worker", &state.worker)
            .field("config", &self.config)
            .finish()
    }
}

impl HashStore {
    /// Create a store hashing with SHA-1
    ///
    /// With [`WorkerMode::Background`] this must be called from within a
    /// tokio runtime; the worker is spawned on that runtime.
    pub fn new(config: HashStoreConfig) -> Result<Arc<Self>> {
        Self::with_hasher(config, Arc::new(Sha1Hasher::new()))
    }

    /// Create a store with a custom hashing collaborator
    pub fn with_hasher(config: HashStoreConfig, hasher: Arc<dyn FileHasher>) -> Result<Arc<Self>> {
        config.validate()?;

        let runtime = match config.worker {
            WorkerMode::Background => {
                Some(Handle::try_current().map_err(|_| InternalError::NoRuntime)?)
            }
            WorkerMode::Manual => None,
        };

        Ok(Arc::new(Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                jobs: BTreeMap::new(),
                worker: WorkerState::Idle,
                changed: false,
                next_job_id: 1,
                stats: StoreStats::default(),
            }),
            hasher,
            config,
            runtime,
            shutdown: AtomicBool::new(false),
            wake: Notify::new(),
        }))
    }

    /// Store configuration
    pub fn config(&self) -> &HashStoreConfig {
        &self.config
    }

    /// Look up the hash of `path`, queueing a hashing job if needed
    ///
    /// `size` and `mod_time` (Unix seconds) describe the file as the caller
    /// sees it now. A cached record is valid only if both match exactly.
    ///
    /// On [`Lookup::Pending`] the client receives at most one later call for
    /// this path: [`HashClient::hash_computed`] on success or
    /// [`HashClient::hash_failed`] once retries are exhausted. A second
    /// request for a path that is already queued joins the existing job, so
    /// only the first requester's client and token are called back.
    /// Cancelled jobs and a store shut down mid-job produce no call at all;
    /// callers that need a guaranteed answer must apply their own timeout.
    pub fn request_hash(
        self: &Arc<Self>,
        path: &Path,
        size: u64,
        mod_time: u64,
        client: Arc<dyn HashClient>,
        token: RequestToken,
    ) -> Result<Lookup> {
        let mut state = self.lock();
        if self.is_shut_down() {
            return Err(InternalError::StoreShutDown.into());
        }

        if let Some(entry) = state.entries.get_mut(path)
            && entry.matches(size, mod_time)
        {
            entry.last_access = unix_now();
            let hash = entry.hash;
            // the refreshed access time keeps the record alive across runs
            state.changed = true;
            state.stats.hit_count += 1;
            debug!("Hash cache hit: {}", path.display());
            return Ok(Lookup::Valid(hash));
        }

        state.stats.miss_count += 1;

        if state.jobs.contains_key(path) {
            state.stats.coalesced_count += 1;
            debug!("Hash already queued: {}", path.display());
            return Ok(Lookup::Pending);
        }

        let id = state.next_job_id;
        state.next_job_id += 1;
        state.jobs.insert(
            path.to_path_buf(),
            PendingJob {
                id,
                client,
                token,
                mod_time,
                attempts: 0,
                retry_at: None,
                in_flight: false,
            },
        );
        debug!("Queued hash job {id} for {}", path.display());

        self.activate_worker(&mut state);
        Ok(Lookup::Pending)
    }

    /// Withdraw the pending request for `path`
    ///
    /// Returns `true` if a job was removed. If the file is being hashed right
    /// now the result is still cached, but no callback fires.
    pub fn cancel(&self, path: &Path) -> bool {
        let removed = self.lock().jobs.remove(path).is_some();
        if removed {
            debug!("Cancelled hash job for {}", path.display());
        }
        removed
    }

    /// Evict records not validated within the retention window
    ///
    /// Returns the number of removed records.
    pub fn clean(&self) -> usize {
        self.clean_at(unix_now())
    }

    /// Evict as if the current time were `now` (Unix seconds)
    pub fn clean_at(&self, now: u64) -> usize {
        let retention_secs = self.config.retention_secs();
        let mut state = self.lock();
        let before = state.entries.len();

        state.entries.retain(|path, entry| {
            let expired = entry.is_expired(retention_secs, now);
            if expired {
                debug!(
                    "Evicting {} (last access {})",
                    path.display(),
                    entry.last_access
                );
            }
            !expired
        });

        let removed = before - state.entries.len();
        if removed > 0 {
            state.changed = true;
            state.stats.evicted_count += removed as u64;
            info!("Evicted {removed} stale hash record(s)");
        }
        removed
    }

    /// Stop accepting requests and drop all pending jobs
    ///
    /// A job being hashed at this moment still lands in the table but its
    /// client is not called.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        // set under the lock so no request can queue after the clear below
        self.shutdown.store(true, Ordering::SeqCst);
        let dropped = state.jobs.len();
        state.jobs.clear();
        state.worker = WorkerState::Idle;
        drop(state);

        self.wake.notify_one();
        info!("Hash store shut down, {dropped} pending job(s) dropped");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Current worker state
    pub fn worker_state(&self) -> WorkerState {
        self.lock().worker
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no records are cached
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of queued jobs, including one being hashed
    pub fn pending_len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Whether a job for `path` is queued
    pub fn is_pending(&self, path: &Path) -> bool {
        self.lock().jobs.contains_key(path)
    }

    /// Copy of the record for `path`, without counting as an access
    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.lock().entries.get(path).cloned()
    }

    /// Activity counters
    pub fn stats(&self) -> StoreStats {
        let state = self.lock();
        StoreStats {
            entry_count: state.entries.len(),
            pending_count: state.jobs.len(),
            total_size_bytes: state.entries.values().map(|e| e.size).sum(),
            ..state.stats.clone()
        }
    }

    /// Whether the table changed since the last [`mark_saved`](Self::mark_saved)
    pub fn has_unsaved_changes(&self) -> bool {
        self.lock().changed
    }

    /// Record that the current table contents have been persisted
    pub fn mark_saved(&self) {
        self.lock().changed = false;
    }

    /// All records, sorted by path
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.lock().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Replace the table with previously persisted records
    ///
    /// Pending jobs are left alone. The table is considered saved afterwards.
    pub fn restore(&self, entries: impl IntoIterator<Item = CacheEntry>) {
        let mut state = self.lock();
        state.entries = entries
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();
        state.changed = false;
        debug!("Restored {} hash record(s)", state.entries.len());
    }

    fn activate_worker(self: &Arc<Self>, state: &mut StoreState) {
        if state.worker == WorkerState::Running {
            // a worker sleeping on a retry backoff should look at the new job
            self.wake.notify_one();
            return;
        }

        state.worker = WorkerState::Running;
        if let Some(runtime) = &self.runtime {
            info!("Starting hashing worker");
            runtime.spawn(worker::run(Arc::clone(self)));
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // callbacks run outside the lock, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
