//! Tests for the spawned background worker

mod common;

use common::{WAIT, background_store, wait_until};
use filehash_core::{FileHash, Lookup, WorkerState};
use filehash_test_utils::{ClientEvent, MockHasher, RecordingClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_background_end_to_end() {
    let hasher = MockHasher::new();
    let path = Path::new("/a/f.txt");
    hasher.with_result(path, [0x11; 20], 100);
    let store = background_store(&hasher);
    let client = Arc::new(RecordingClient::new());

    let lookup = store
        .request_hash(path, 100, 1000, client.clone(), 42)
        .unwrap();
    assert_eq!(lookup, Lookup::Pending);

    let events = client.wait_for(1, WAIT).await;
    assert_eq!(
        events,
        vec![ClientEvent::Computed {
            token: 42,
            path: path.to_path_buf(),
            hash: FileHash::from_bytes([0x11; 20]),
            size: 100,
        }]
    );

    // the worker settles before the callback fires
    assert_eq!(store.worker_state(), WorkerState::Idle);
    assert_eq!(
        store
            .request_hash(path, 100, 1000, client.clone(), 43)
            .unwrap(),
        Lookup::Valid(FileHash::from_bytes([0x11; 20]))
    );
}

#[tokio::test]
async fn test_single_worker_drains_many_jobs() {
    let hasher = MockHasher::new();
    hasher.set_delay(Duration::from_millis(2));
    hasher.hold();
    let store = background_store(&hasher);
    let client = Arc::new(RecordingClient::new());

    for i in 0..10u64 {
        let path = format!("/media/file-{i}.bin");
        store
            .request_hash(Path::new(&path), i, i, client.clone(), i)
            .unwrap();
        assert_eq!(store.worker_state(), WorkerState::Running);
    }
    assert!(wait_until(|| hasher.running_calls() == 1).await);

    hasher.release();
    let events = client.wait_for(10, WAIT).await;

    assert_eq!(events.len(), 10);
    assert_eq!(hasher.max_concurrent_calls(), 1);
    assert_eq!(hasher.total_calls(), 10);
    assert!(wait_until(|| store.worker_state() == WorkerState::Idle).await);
    assert_eq!(store.pending_len(), 0);
}

#[tokio::test]
async fn test_worker_restarts_after_idle() {
    let hasher = MockHasher::new();
    let store = background_store(&hasher);
    let client = Arc::new(RecordingClient::new());

    store
        .request_hash(Path::new("/first"), 1, 1, client.clone(), 1)
        .unwrap();
    client.wait_for(1, WAIT).await;
    assert_eq!(store.worker_state(), WorkerState::Idle);

    store
        .request_hash(Path::new("/second"), 1, 1, client.clone(), 2)
        .unwrap();
    let events = client.wait_for(2, WAIT).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].path(), Path::new("/second"));
}

#[tokio::test]
async fn test_background_retry_recovers() {
    let hasher = MockHasher::new();
    let path = Path::new("/flaky.bin");
    hasher.fail_retryable(path, 2);
    let store = background_store(&hasher);
    let client = Arc::new(RecordingClient::new());

    store.request_hash(path, 1, 1, client.clone(), 1).unwrap();
    let events = client.wait_for(1, WAIT).await;

    assert!(matches!(events[..], [ClientEvent::Computed { token: 1, .. }]));
    assert_eq!(hasher.call_count(path), 3);
    assert_eq!(store.stats().retry_count, 2);
}

#[tokio::test]
async fn test_new_job_not_blocked_by_backoff() {
    use filehash_core::{HashStore, HashStoreConfig};

    let hasher = MockHasher::new();
    hasher.fail_retryable(Path::new("/a-slow"), 1);
    let config = HashStoreConfig::default()
        .with_retry_delays(Duration::from_secs(60), Duration::from_secs(60));
    let store = HashStore::with_hasher(config, Arc::new(hasher.clone())).unwrap();
    let client = Arc::new(RecordingClient::new());

    store
        .request_hash(Path::new("/a-slow"), 1, 1, client.clone(), 1)
        .unwrap();
    assert!(wait_until(|| store.stats().retry_count == 1).await);

    store
        .request_hash(Path::new("/b-fast"), 1, 1, client.clone(), 2)
        .unwrap();
    let events = client.wait_for(1, WAIT).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path(), Path::new("/b-fast"));
    assert!(store.is_pending(Path::new("/a-slow")));
    store.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_worker() {
    let hasher = MockHasher::new();
    hasher.hold();
    let store = background_store(&hasher);
    let client = Arc::new(RecordingClient::new());

    store
        .request_hash(Path::new("/a"), 1, 1, client.clone(), 1)
        .unwrap();
    store
        .request_hash(Path::new("/b"), 1, 1, client.clone(), 2)
        .unwrap();
    assert!(wait_until(|| hasher.running_calls() == 1).await);

    store.shutdown();
    hasher.release();

    assert!(wait_until(|| hasher.running_calls() == 0).await);
    assert!(store.request_hash(Path::new("/c"), 1, 1, client.clone(), 3).is_err());
    assert!(client.is_empty());
    assert_eq!(store.worker_state(), WorkerState::Idle);
}
