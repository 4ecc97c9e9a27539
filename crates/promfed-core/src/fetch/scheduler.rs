use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use promfed_model::LabelUniverse;
use promfed_upstream::UpstreamApi;

use super::{
    FetcherConfig,
    pool::{CycleReport, WorkerPool},
    worker::FetchWorker,
};
use crate::{
    cache::MetricCache, discover::UniverseReader, error::CoreError, transform::MetricTransformer,
};

/// Drives fetch cycles over the discovered metric names.
///
/// A cycle enqueues one query per name, waits for all of them, then sleeps for the
/// configured interval before the next one starts.
pub struct FetchScheduler {
    cfg: FetcherConfig,
    labels: UniverseReader,
    pool: WorkerPool,
    pinned: Option<LabelUniverse>,
}

impl FetchScheduler {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn new(
        cfg: FetcherConfig,
        upstream: Arc<dyn UpstreamApi>,
        cache: MetricCache,
        labels: UniverseReader,
    ) -> Result<Self, CoreError> {
        cfg.validate()?;
        let worker = FetchWorker::new(
            upstream,
            MetricTransformer::new(cfg.namespace.clone()),
            cache,
            cfg.query_timeout,
        );
        let pool = WorkerPool::spawn(cfg.workers, Arc::new(worker));

        Ok(Self {
            cfg,
            labels,
            pool,
            pinned: None,
        })
    }

    /// Universe for the next cycle.
    fn universe(&mut self) -> LabelUniverse {
        if self.cfg.refresh_labels_each_cycle {
            return self.labels.current();
        }
        self.pinned
            .get_or_insert_with(|| self.labels.current())
            .clone()
    }

    /// Run a single cycle over the current universe.
    pub async fn run_cycle(&mut self, token: &CancellationToken) -> CycleReport {
        let universe = self.universe();
        debug!(jobs = universe.len(), workers = self.pool.size(), "fetch cycle starting");

        let report = self
            .pool
            .run_cycle(universe.iter().map(str::to_string), token)
            .await;

        info!(
            jobs = report.jobs,
            stored = report.stored,
            empty = report.empty,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "fetch cycle finished"
        );
        report
    }

    /// Run cycles until `token` is cancelled, then drain the pool.
    pub async fn run(mut self, token: CancellationToken) {
        info!(
            routine = "fetching",
            workers = self.pool.size(),
            interval_secs = self.cfg.interval.as_secs(),
            "fetch scheduler started"
        );
        loop {
            self.run_cycle(&token).await;
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.cfg.interval) => {}
            }
        }
        self.pool.shutdown().await;
        info!(routine = "fetching", "fetch scheduler stopped");
    }
}
