//! Common test utilities for integration tests
//!
//! Shared store construction and polling helpers used across the store
//! integration tests.

#![allow(dead_code)]

use filehash_core::{HashStore, HashStoreConfig, WorkerMode};
use filehash_test_utils::MockHasher;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timeout for anything expected to finish promptly
pub const WAIT: Duration = Duration::from_secs(5);

/// Store driven by explicit `tick` calls, retries without delay
pub fn manual_store(hasher: &MockHasher) -> Arc<HashStore> {
    let config = HashStoreConfig::default()
        .with_worker(WorkerMode::Manual)
        .with_retry_delays(Duration::ZERO, Duration::ZERO);
    HashStore::with_hasher(config, Arc::new(hasher.clone())).unwrap()
}

/// Store with a spawned worker; must be called inside a runtime
pub fn background_store(hasher: &MockHasher) -> Arc<HashStore> {
    let config = HashStoreConfig::default()
        .with_retry_delays(Duration::from_millis(5), Duration::from_millis(20));
    HashStore::with_hasher(config, Arc::new(hasher.clone())).unwrap()
}

/// Poll `condition` until it holds or `WAIT` elapses
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
