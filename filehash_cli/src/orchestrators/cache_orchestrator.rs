//! Maintenance of the persisted hash table: `clean` and `stats`

use crate::config::AppConfig;
use anyhow::{Context, Result};
use filehash_core::{CacheFile, HashStore, WorkerMode};
use serde::Serialize;
use std::path::PathBuf;

/// Result of an eviction sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub remaining: usize,
    pub retention_days: u32,
}

/// Summary of the persisted table
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub cache_file: PathBuf,
    pub entry_count: usize,
    pub total_size_bytes: u64,
    /// Oldest last-validation time, Unix seconds
    pub oldest_access: Option<u64>,
    pub newest_access: Option<u64>,
}

/// Evict stale records from the cache file
///
/// `retention_days` overrides the configured window for this sweep.
pub async fn clean_cache(config: &AppConfig, retention_days: Option<u32>) -> Result<CleanReport> {
    let mut store_config = config.store.to_store_config().with_worker(WorkerMode::Manual);
    if let Some(days) = retention_days {
        store_config = store_config.with_retention_days(days);
    }
    let retention_days = store_config.retention_days;

    let store = HashStore::new(store_config).context("Invalid retention settings")?;
    let cache_file = CacheFile::new(config.cache_file());
    cache_file
        .load_into(&store)
        .await
        .with_context(|| format!("Failed to load cache file {}", cache_file.path().display()))?;

    let removed = store.clean();
    cache_file
        .flush(&store)
        .await
        .with_context(|| format!("Failed to save cache file {}", cache_file.path().display()))?;

    Ok(CleanReport {
        removed,
        remaining: store.len(),
        retention_days,
    })
}

/// Read the cache file and summarize its contents
pub async fn summarize_cache(config: &AppConfig) -> Result<CacheSummary> {
    let cache_file = CacheFile::new(config.cache_file());
    let entries = cache_file
        .load()
        .await
        .with_context(|| format!("Failed to load cache file {}", cache_file.path().display()))?;

    Ok(CacheSummary {
        cache_file: cache_file.path().to_path_buf(),
        entry_count: entries.len(),
        total_size_bytes: entries.iter().map(|e| e.size).sum(),
        oldest_access: entries.iter().map(|e| e.last_access).min(),
        newest_access: entries.iter().map(|e| e.last_access).max(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrators::{HashOrchestrator, HashRunOptions};
    use filehash_core::to_unix_secs;
    use filehash_test_utils::CacheEntryBuilder;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(Some(dir.path().join("hashes.json")));
        config
    }

    async fn seed(config: &AppConfig) {
        CacheFile::new(config.cache_file())
            .save(&[
                CacheEntryBuilder::new("/old.mkv")
                    .with_size(10)
                    .accessed_days_ago(40)
                    .build(),
                CacheEntryBuilder::new("/mid.mkv")
                    .with_size(20)
                    .accessed_days_ago(10)
                    .build(),
                CacheEntryBuilder::new("/new.mkv")
                    .with_size(30)
                    .accessed_days_ago(1)
                    .build(),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clean_with_configured_retention() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        seed(&config).await;

        let report = clean_cache(&config, None).await.unwrap();

        assert_eq!(
            report,
            CleanReport {
                removed: 1,
                remaining: 2,
                retention_days: 30,
            }
        );
        assert_eq!(summarize_cache(&config).await.unwrap().entry_count, 2);
    }

    #[tokio::test]
    async fn test_clean_with_override() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        seed(&config).await;

        let report = clean_cache(&config, Some(5)).await.unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(report.remaining, 1);
        assert!(clean_cache(&config, Some(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_entry_validated_by_hash_run_is_not_evicted() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let media = dir.path().join("episode.mkv");
        std::fs::write(&media, b"episode").unwrap();
        let metadata = std::fs::metadata(&media).unwrap();

        CacheFile::new(config.cache_file())
            .save(&[CacheEntryBuilder::new(media.to_str().unwrap())
                .with_size(metadata.len())
                .with_mod_stamp(to_unix_secs(metadata.modified().unwrap()))
                .accessed_days_ago(31)
                .build()])
            .await
            .unwrap();

        let orchestrator = HashOrchestrator::open(&config).await.unwrap();
        let report = orchestrator
            .hash_files(std::slice::from_ref(&media), &HashRunOptions::default())
            .await
            .unwrap();
        assert_eq!(report.cached_count(), 1);
        orchestrator.finish().await.unwrap();

        let report = clean_cache(&config, None).await.unwrap();

        assert_eq!(report.removed, 0);
        assert_eq!(report.remaining, 1);
    }

    #[tokio::test]
    async fn test_summary() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        seed(&config).await;

        let summary = summarize_cache(&config).await.unwrap();

        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.total_size_bytes, 60);
        assert!(summary.oldest_access.unwrap() < summary.newest_access.unwrap());
    }

    #[tokio::test]
    async fn test_summary_of_missing_file() {
        let dir = TempDir::new().unwrap();
        let summary = summarize_cache(&config_for(&dir)).await.unwrap();

        assert_eq!(summary.entry_count, 0);
        assert!(summary.oldest_access.is_none());
    }
}
