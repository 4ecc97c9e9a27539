mod pool;
pub use pool::{CycleReport, WorkerPool};

mod worker;
pub use worker::{FetchOutcome, FetchWorker};

mod scheduler;
pub use scheduler::FetchScheduler;

use std::time::Duration;

use promfed_model::MetricNamespace;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Number of persistent workers issuing queries (default: 50).
    pub workers: usize,
    /// Pause between the end of one cycle and the start of the next (default: 1 minute).
    pub interval: Duration,
    /// Deadline for a single instant query (default: 50 seconds).
    pub query_timeout: Duration,
    /// Prefix applied to every family name.
    pub namespace: MetricNamespace,
    /// Re-read the label universe at the start of every cycle (default: true).
    ///
    /// When disabled, the universe seen by the first cycle is reused for the lifetime
    /// of the scheduler.
    pub refresh_labels_each_cycle: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            interval: Duration::from_secs(60),
            query_timeout: Duration::from_secs(50),
            namespace: MetricNamespace::default(),
            refresh_labels_each_cycle: true,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.workers == 0 {
            return Err(CoreError::InvalidConfig("workers must be positive".into()));
        }
        if self.interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "fetch interval must be positive".into(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "query timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}
