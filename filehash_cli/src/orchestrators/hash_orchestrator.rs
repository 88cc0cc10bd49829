//! Hash command orchestrator
//!
//! Loads the persisted table into a [`HashStore`], requests every file, waits
//! for the background worker to call back for the misses and saves the table
//! again.

use crate::config::AppConfig;
use crate::output::{HashRecord, RecordStatus};
use crate::progress::HashProgress;
use anyhow::{Context, Result};
use filehash_core::{
    CacheFile, Error as CoreError, FileHash, HashClient, HashStore, Lookup, RequestToken,
    error::InternalError, to_unix_secs,
};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Callback delivered through the channel
#[derive(Debug)]
enum HashEvent {
    Computed {
        token: RequestToken,
        hash: FileHash,
        size: u64,
    },
    Failed {
        token: RequestToken,
        message: String,
    },
}

impl HashEvent {
    fn token(&self) -> RequestToken {
        match self {
            Self::Computed { token, .. } | Self::Failed { token, .. } => *token,
        }
    }
}

/// Forwards store callbacks to the waiting command
struct ChannelClient {
    tx: mpsc::UnboundedSender<HashEvent>,
}

impl HashClient for ChannelClient {
    fn hash_computed(&self, token: RequestToken, _path: &Path, hash: FileHash, size: u64) {
        // the receiver is gone once the command stopped waiting
        let _ = self.tx.send(HashEvent::Computed { token, hash, size });
    }

    fn hash_failed(&self, token: RequestToken, _path: &Path, error: &CoreError) {
        let _ = self.tx.send(HashEvent::Failed {
            token,
            message: error.to_string(),
        });
    }
}

/// Options for one `hash` run
#[derive(Debug, Clone, Default)]
pub struct HashRunOptions {
    /// Give up on files without an answer after this long
    pub timeout: Option<Duration>,
    pub show_progress: bool,
}

/// Outcome of one `hash` run, in input order
#[derive(Debug)]
pub struct HashReport {
    pub records: Vec<HashRecord>,
    pub elapsed: Duration,
}

impl HashReport {
    /// Records answered from the cache
    pub fn cached_count(&self) -> usize {
        self.count(RecordStatus::Cached)
    }

    /// Records hashed during this run
    pub fn hashed_count(&self) -> usize {
        self.count(RecordStatus::Hashed)
    }

    /// Records without a hash
    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.status.is_success())
            .count()
    }

    /// Bytes read to compute new hashes
    pub fn hashed_bytes(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Hashed)
            .map(|r| r.size)
            .sum()
    }

    fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Orchestrator for the hash command
pub struct HashOrchestrator {
    store: Arc<HashStore>,
    cache_file: CacheFile,
}

impl HashOrchestrator {
    /// Build the store from configuration and load the cache file
    ///
    /// Must run inside a tokio runtime; the store spawns its worker there.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let store = HashStore::new(config.store.to_store_config())
            .context("Failed to create hash store")?;
        let cache_file = CacheFile::new(config.cache_file());
        Self::with_store(store, cache_file).await
    }

    /// Use an existing store, loading `cache_file` into it
    ///
    /// A cache file that cannot be parsed is logged and replaced on the next
    /// save.
    pub async fn with_store(store: Arc<HashStore>, cache_file: CacheFile) -> Result<Self> {
        match cache_file.load_into(&store).await {
            Ok(count) => debug!("Loaded {count} cached hash(es)"),
            Err(CoreError::Internal(InternalError::CacheFormat { message })) => {
                warn!("Ignoring unreadable cache file: {message}");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to load cache file {}", cache_file.path().display())
                });
            }
        }
        Ok(Self { store, cache_file })
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<HashStore> {
        &self.store
    }

    /// Hash `files`, answering from the cache where possible
    ///
    /// `files` should be free of duplicates: a repeated path joins the first
    /// request and gets no callback of its own.
    pub async fn hash_files(&self, files: &[PathBuf], options: &HashRunOptions) -> Result<HashReport> {
        let started = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client: Arc<dyn HashClient> = Arc::new(ChannelClient { tx });

        let mut records: Vec<Option<HashRecord>> = vec![None; files.len()];
        let mut waiting = 0usize;

        for (index, path) in files.iter().enumerate() {
            let (size, mod_time) = match stat(path).await {
                Ok(stat) => stat,
                Err(e) => {
                    records[index] = Some(HashRecord::failure(
                        path.clone(),
                        0,
                        RecordStatus::Failed,
                        format!("{e:#}"),
                    ));
                    continue;
                }
            };

            let lookup = self
                .store
                .request_hash(path, size, mod_time, Arc::clone(&client), index as RequestToken)
                .context("Hash store rejected request")?;
            match lookup {
                Lookup::Valid(hash) => {
                    records[index] = Some(HashRecord::success(
                        path.clone(),
                        hash,
                        size,
                        RecordStatus::Cached,
                    ));
                }
                Lookup::Pending => waiting += 1,
            }
        }
        drop(client);
        info!(
            "{} file(s) cached, {waiting} queued for hashing",
            files.len() - waiting
        );

        let progress = (options.show_progress && waiting > 0)
            .then(|| HashProgress::new(waiting as u64));
        let deadline = options
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        while waiting > 0 {
            let received = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        warn!("Timed out waiting for {waiting} hash(es)");
                        break;
                    }
                },
                None => rx.recv().await,
            };
            let Some(event) = received else {
                break;
            };

            let index = event.token() as usize;
            let Some(path) = files.get(index) else {
                continue;
            };
            if records[index].is_some() {
                continue;
            }
            waiting -= 1;
            if let Some(progress) = &progress {
                progress.advance(path);
            }

            records[index] = Some(match event {
                HashEvent::Computed { hash, size, .. } => {
                    HashRecord::success(path.clone(), hash, size, RecordStatus::Hashed)
                }
                HashEvent::Failed { message, .. } => {
                    HashRecord::failure(path.clone(), 0, RecordStatus::Failed, message)
                }
            });
        }

        if let Some(progress) = progress {
            progress.finish();
        }

        let records = records
            .into_iter()
            .zip(files)
            .map(|(record, path)| {
                record.unwrap_or_else(|| {
                    self.store.cancel(path);
                    HashRecord::failure(
                        path.clone(),
                        0,
                        RecordStatus::TimedOut,
                        "no result before the timeout".to_string(),
                    )
                })
            })
            .collect();

        Ok(HashReport {
            records,
            elapsed: started.elapsed(),
        })
    }

    /// Save the table if it changed, then stop the store
    ///
    /// Returns whether the cache file was written.
    pub async fn finish(self) -> Result<bool> {
        let written = self.cache_file.flush(&self.store).await.with_context(|| {
            format!(
                "Failed to save cache file {}",
                self.cache_file.path().display()
            )
        })?;
        self.store.shutdown();
        Ok(written)
    }
}

/// Size and modification time (Unix seconds) of `path`
async fn stat(path: &Path) -> Result<(u64, u64)> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot stat {}", path.display()))?;
    let modified = metadata
        .modified()
        .with_context(|| format!("No modification time for {}", path.display()))?;
    Ok((metadata.len(), to_unix_secs(modified)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filehash_core::HashStoreConfig;
    use filehash_test_utils::MockHasher;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn orchestrator(dir: &TempDir, hasher: &MockHasher) -> HashOrchestrator {
        let config = HashStoreConfig::default()
            .with_retry_delays(Duration::from_millis(1), Duration::from_millis(1));
        let store = HashStore::with_hasher(config, Arc::new(hasher.clone())).unwrap();
        HashOrchestrator::with_store(store, CacheFile::new(dir.path().join("hashes.json")))
            .await
            .unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_miss_then_hit_across_runs() {
        let dir = TempDir::new().unwrap();
        let hasher = MockHasher::new();
        let file = write_file(&dir, "a.bin", b"abc");
        hasher.with_result(&file, [0x33; 20], 3);

        let first = orchestrator(&dir, &hasher).await;
        let report = first
            .hash_files(std::slice::from_ref(&file), &HashRunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.hashed_count(), 1);
        assert_eq!(report.hashed_bytes(), 3);
        assert!(first.finish().await.unwrap());

        let second = orchestrator(&dir, &hasher).await;
        let report = second
            .hash_files(std::slice::from_ref(&file), &HashRunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.cached_count(), 1);
        assert_eq!(
            report.records[0].hash,
            Some(FileHash::from_bytes([0x33; 20]))
        );
        assert_eq!(hasher.call_count(&file), 1);
        // the hit refreshed the record's access time
        assert!(second.finish().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_and_hash_failure_reported() {
        let dir = TempDir::new().unwrap();
        let hasher = MockHasher::new();
        let broken = write_file(&dir, "broken.bin", b"x");
        hasher.fail_missing(&broken);
        let missing = dir.path().join("missing.bin");

        let orchestrator = orchestrator(&dir, &hasher).await;
        let report = orchestrator
            .hash_files(&[broken, missing], &HashRunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failed_count(), 2);
        assert!(report.records.iter().all(|r| r.status == RecordStatus::Failed));
        assert!(report.records[1].error.as_ref().unwrap().contains("Cannot stat"));
    }

    #[tokio::test]
    async fn test_timeout_cancels_outstanding_jobs() {
        let dir = TempDir::new().unwrap();
        let hasher = MockHasher::new();
        hasher.hold();
        let file = write_file(&dir, "slow.bin", b"slow");

        let orchestrator = orchestrator(&dir, &hasher).await;
        let options = HashRunOptions {
            timeout: Some(Duration::from_millis(50)),
            show_progress: false,
        };
        let report = orchestrator
            .hash_files(std::slice::from_ref(&file), &options)
            .await
            .unwrap();
        hasher.release();

        assert_eq!(report.records[0].status, RecordStatus::TimedOut);
        assert!(!orchestrator.store().is_pending(&file));
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hashes.json"), b"garbage").unwrap();

        let orchestrator = orchestrator(&dir, &MockHasher::new()).await;
        assert!(orchestrator.store().is_empty());
    }
}
