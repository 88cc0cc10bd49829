//! Client that records every callback it receives

use filehash_core::{Error, FileHash, HashClient, RequestToken};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A callback observed by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Computed {
        token: RequestToken,
        path: PathBuf,
        hash: FileHash,
        size: u64,
    },
    Failed {
        token: RequestToken,
        path: PathBuf,
        message: String,
    },
}

impl ClientEvent {
    /// Path the event is about
    pub fn path(&self) -> &Path {
        match self {
            Self::Computed { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    /// Token the event carries
    pub fn token(&self) -> RequestToken {
        match self {
            Self::Computed { token, .. } | Self::Failed { token, .. } => *token,
        }
    }
}

/// [`HashClient`] that stores callbacks and lets tests wait for them
#[derive(Default)]
pub struct RecordingClient {
    events: Mutex<Vec<ClientEvent>>,
    notify: Notify,
}

impl RecordingClient {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of events received so far
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Whether no callback has arrived yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` events arrived or `timeout` elapsed
    ///
    /// Returns the events received by then.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ClientEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.len() >= count {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        self.events()
    }

    fn push(&self, event: ClientEvent) {
        self.events.lock().unwrap().push(event);
        self.notify.notify_one();
    }
}

impl HashClient for RecordingClient {
    fn hash_computed(&self, token: RequestToken, path: &Path, hash: FileHash, size: u64) {
        self.push(ClientEvent::Computed {
            token,
            path: path.to_path_buf(),
            hash,
            size,
        });
    }

    fn hash_failed(&self, token: RequestToken, path: &Path, error: &Error) {
        self.push(ClientEvent::Failed {
            token,
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}
