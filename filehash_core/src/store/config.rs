//! Store configuration

use crate::entry::SECONDS_PER_DAY;
use crate::{Result, error::ValidationError};
use std::time::Duration;

/// How pending jobs get drained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerMode {
    /// A tokio task is spawned when the first job arrives and exits once the
    /// queue is empty
    #[default]
    Background,
    /// Nothing is spawned; the owner calls [`HashStore::tick`](super::HashStore::tick)
    Manual,
}

/// Configuration for a [`HashStore`](super::HashStore)
#[derive(Debug, Clone)]
pub struct HashStoreConfig {
    /// Entries not validated for this many days are evicted by `clean`
    pub retention_days: u32,
    /// Hash attempts per job before it is dropped and reported as failed
    pub max_attempts: u32,
    /// Delay before the first retry of a failed job
    pub initial_retry_delay: Duration,
    /// Upper bound for the exponential retry delay
    pub max_retry_delay: Duration,
    pub worker: WorkerMode,
}

impl Default for HashStoreConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            max_attempts: 3,
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(60),
            worker: WorkerMode::Background,
        }
    }
}

impl HashStoreConfig {
    /// Set the retention window in days
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Set the number of hash attempts per job
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial and maximum retry delays
    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_retry_delay = initial;
        self.max_retry_delay = max;
        self
    }

    /// Set the worker mode
    pub fn with_worker(mut self, worker: WorkerMode) -> Self {
        self.worker = worker;
        self
    }

    /// Check the configuration for values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            return Err(
                ValidationError::invalid_configuration("retention_days must be at least 1").into(),
            );
        }
        if self.max_attempts == 0 {
            return Err(
                ValidationError::invalid_configuration("max_attempts must be at least 1").into(),
            );
        }
        if self.initial_retry_delay > self.max_retry_delay {
            return Err(ValidationError::invalid_configuration(
                "initial_retry_delay must not exceed max_retry_delay",
            )
            .into());
        }
        Ok(())
    }

    /// Retention window in seconds
    pub fn retention_secs(&self) -> u64 {
        u64::from(self.retention_days) * SECONDS_PER_DAY
    }

    /// Backoff before the next attempt, given how many attempts already failed
    pub fn retry_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_retry_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_retry_delay)
    }
}
