//! Worker step and background loop

use super::{HashStore, StoreState, WorkerState};
use crate::client::{HashClient, RequestToken};
use crate::entry::{CacheEntry, unix_now};
use crate::hashing::HashedFile;
use crate::{Error, Result, error::InternalError};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll interval when every queued job is already claimed by another ticker
const IN_FLIGHT_POLL: Duration = Duration::from_millis(50);

/// What happened to the job a tick processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Hash cached and client called back
    Hashed,
    /// Hash failed; the job stays queued for another attempt
    Retrying,
    /// Hash failed for the last time; job dropped and client told
    Failed,
    /// The job was withdrawn while it was being hashed
    Cancelled,
}

/// Result of one [`HashStore::tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing queued; the worker is now idle
    Idle,
    /// Every queued job is waiting for its retry time
    Waiting(Duration),
    /// One job was processed
    Processed {
        path: PathBuf,
        outcome: JobOutcome,
        /// The queue was empty afterwards and the worker went idle
        worker_idle: bool,
    },
}

impl Tick {
    /// Whether the worker stopped at the end of this tick
    pub fn worker_idle(&self) -> bool {
        matches!(
            self,
            Self::Idle
                | Self::Processed {
                    worker_idle: true,
                    ..
                }
        )
    }
}

/// Fields copied out of a job so it can be hashed without the lock
struct Claim {
    id: u64,
    path: PathBuf,
    client: Arc<dyn HashClient>,
    token: RequestToken,
    mod_time: u64,
}

enum Selection {
    Claimed(Claim),
    Empty,
    Wait(Duration),
}

impl StoreState {
    fn claim_next(&mut self, now: Instant) -> Selection {
        if self.jobs.is_empty() {
            return Selection::Empty;
        }

        let ready = self
            .jobs
            .iter_mut()
            .find(|(_, job)| !job.in_flight && job.retry_at.is_none_or(|at| at <= now));

        if let Some((path, job)) = ready {
            job.in_flight = true;
            return Selection::Claimed(Claim {
                id: job.id,
                path: path.clone(),
                client: Arc::clone(&job.client),
                token: job.token,
                mod_time: job.mod_time,
            });
        }

        let wait = self
            .jobs
            .values()
            .filter(|job| !job.in_flight)
            .filter_map(|job| job.retry_at)
            .min()
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(IN_FLIGHT_POLL);
        Selection::Wait(wait)
    }

    /// Remove the claimed job if it is still the one queued for its path
    fn release(&mut self, claim: &Claim) -> bool {
        let current = self
            .jobs
            .get(&claim.path)
            .is_some_and(|job| job.id == claim.id);
        if current {
            self.jobs.remove(&claim.path);
        }
        current
    }

    /// Go idle if nothing is left to do
    fn settle_worker(&mut self) -> bool {
        if self.jobs.is_empty() {
            self.worker = WorkerState::Idle;
            true
        } else {
            false
        }
    }
}

impl HashStore {
    /// Process at most one ready job
    ///
    /// Selects a queued job (lowest path first among those not waiting on a
    /// retry), hashes it on tokio's blocking pool without holding the lock,
    /// then commits the outcome. In [`WorkerMode::Manual`](super::WorkerMode::Manual)
    /// the owner calls this repeatedly until [`Tick::worker_idle`] is true.
    pub async fn tick(&self) -> Tick {
        let claim = {
            let mut state = self.lock();
            if self.is_shut_down() {
                state.worker = WorkerState::Idle;
                return Tick::Idle;
            }
            match state.claim_next(Instant::now()) {
                Selection::Claimed(claim) => claim,
                Selection::Empty => {
                    state.worker = WorkerState::Idle;
                    return Tick::Idle;
                }
                Selection::Wait(delay) => return Tick::Waiting(delay),
            }
        };

        debug!("Hashing {} (job {})", claim.path.display(), claim.id);
        let result = self.hash_claimed(&claim).await;

        match result {
            Ok(hashed) => self.complete(claim, hashed),
            Err(err) => self.fail(claim, err),
        }
    }

    async fn hash_claimed(&self, claim: &Claim) -> Result<HashedFile> {
        let hasher = Arc::clone(&self.hasher);
        let path = claim.path.clone();

        tokio::task::spawn_blocking(move || hasher.hash_file(&path))
            .await
            .unwrap_or_else(|join_err| {
                Err(InternalError::hash_calculation(
                    self.hasher.name(),
                    &format!("hashing task did not finish: {join_err}"),
                )
                .into())
            })
    }

    fn complete(&self, claim: Claim, hashed: HashedFile) -> Tick {
        let (delivered, worker_idle) = {
            let mut state = self.lock();
            state.entries.insert(
                claim.path.clone(),
                CacheEntry {
                    path: claim.path.clone(),
                    hash: hashed.hash,
                    size: hashed.size,
                    mod_stamp: claim.mod_time,
                    last_access: unix_now(),
                },
            );
            state.changed = true;
            state.stats.hashed_count += 1;

            let delivered = state.release(&claim) && !self.is_shut_down();
            (delivered, state.settle_worker())
        };

        let outcome = if delivered {
            claim
                .client
                .hash_computed(claim.token, &claim.path, hashed.hash, hashed.size);
            JobOutcome::Hashed
        } else {
            debug!(
                "Job for {} was withdrawn, result cached without callback",
                claim.path.display()
            );
            JobOutcome::Cancelled
        };

        Tick::Processed {
            path: claim.path,
            outcome,
            worker_idle,
        }
    }

    fn fail(&self, claim: Claim, err: Error) -> Tick {
        let (outcome, worker_idle) = {
            let mut state = self.lock();
            let max_attempts = self.config.max_attempts;

            let outcome = match state.jobs.get_mut(&claim.path) {
                Some(job) if job.id == claim.id => {
                    job.in_flight = false;
                    job.attempts += 1;

                    if err.is_retryable() && job.attempts < max_attempts {
                        let delay = self.config.retry_delay(job.attempts);
                        job.retry_at = Some(Instant::now() + delay);
                        warn!(
                            "Hashing {} failed (attempt {}/{}), retrying in {:?}: {}",
                            claim.path.display(),
                            job.attempts,
                            max_attempts,
                            delay,
                            err
                        );
                        JobOutcome::Retrying
                    } else {
                        error!(
                            "Giving up on {} after {} attempt(s): {}",
                            claim.path.display(),
                            job.attempts,
                            err
                        );
                        JobOutcome::Failed
                    }
                }
                _ => JobOutcome::Cancelled,
            };

            match outcome {
                JobOutcome::Retrying => state.stats.retry_count += 1,
                JobOutcome::Failed => {
                    state.jobs.remove(&claim.path);
                    state.stats.failed_count += 1;
                }
                _ => {}
            }
            (outcome, state.settle_worker())
        };

        if outcome == JobOutcome::Failed {
            claim.client.hash_failed(claim.token, &claim.path, &err);
        }

        Tick::Processed {
            path: claim.path,
            outcome,
            worker_idle,
        }
    }
}

/// Background loop: tick until the queue drains
pub(super) async fn run(store: Arc<HashStore>) {
    loop {
        let tick = store.tick().await;
        if tick.worker_idle() {
            break;
        }
        if let Tick::Waiting(delay) = tick {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = store.wake.notified() => {}
            }
        }
    }
    info!("Hashing worker idle");
}
