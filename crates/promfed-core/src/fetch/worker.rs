use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::{debug, trace, warn};

use promfed_upstream::UpstreamApi;

use crate::{cache::MetricCache, transform::MetricTransformer};

/// Result of fetching one metric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A family was written to the cache.
    Stored,
    /// The query succeeded but produced no named series; the cache was left alone.
    Empty,
    /// The query failed or timed out; the cache was left alone.
    Failed,
}

/// Queries one metric name, transforms the result and publishes it.
pub struct FetchWorker {
    upstream: Arc<dyn UpstreamApi>,
    transformer: MetricTransformer,
    cache: MetricCache,
    query_timeout: Duration,
}

impl FetchWorker {
    pub fn new(
        upstream: Arc<dyn UpstreamApi>,
        transformer: MetricTransformer,
        cache: MetricCache,
        query_timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            transformer,
            cache,
            query_timeout,
        }
    }

    pub async fn fetch(&self, metric_name: &str) -> FetchOutcome {
        let query = self.upstream.instant_query(metric_name, SystemTime::now());
        let samples = match tokio::time::timeout(self.query_timeout, query).await {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                warn!(metric_name, "error when querying on metric store: {e}");
                return FetchOutcome::Failed;
            }
            Err(_) => {
                warn!(
                    metric_name,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "query on metric store timed out"
                );
                return FetchOutcome::Failed;
            }
        };
        trace!(metric_name, samples = samples.len(), "query returned");

        match self.transformer.transform(metric_name, &samples) {
            Some(family) => {
                let key = family.name().to_string();
                if self.cache.store(key, family) {
                    FetchOutcome::Stored
                } else {
                    FetchOutcome::Empty
                }
            }
            None => {
                debug!(metric_name, "query produced no named series");
                FetchOutcome::Empty
            }
        }
    }
}
