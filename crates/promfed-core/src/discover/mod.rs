use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use promfed_model::{LabelUniverse, METRIC_NAME_LABEL};
use promfed_upstream::UpstreamApi;

use crate::error::CoreError;

/// Keeps the set of known metric names current.
///
/// Each successful refresh publishes a new [`LabelUniverse`]; a failed one leaves the
/// previous universe in place.
pub struct LabelDiscoverer {
    upstream: Arc<dyn UpstreamApi>,
    timeout: Duration,
    universe: watch::Sender<LabelUniverse>,
}

/// Read side of the published label universe.
#[derive(Clone)]
pub struct UniverseReader {
    rx: watch::Receiver<LabelUniverse>,
}

impl UniverseReader {
    /// The most recently published universe.
    pub fn current(&self) -> LabelUniverse {
        self.rx.borrow().clone()
    }
}

impl LabelDiscoverer {
    pub fn new(upstream: Arc<dyn UpstreamApi>, timeout: Duration) -> Self {
        let (universe, _) = watch::channel(LabelUniverse::new());
        Self {
            upstream,
            timeout,
            universe,
        }
    }

    pub fn reader(&self) -> UniverseReader {
        UniverseReader {
            rx: self.universe.subscribe(),
        }
    }

    pub fn current(&self) -> LabelUniverse {
        self.universe.borrow().clone()
    }

    /// Ask the upstream for all metric names and publish them.
    pub async fn refresh(&self) -> Result<LabelUniverse, CoreError> {
        let values = tokio::time::timeout(self.timeout, self.upstream.label_values(METRIC_NAME_LABEL))
            .await
            .map_err(|_| CoreError::Timeout {
                operation: "label discovery",
                after: self.timeout,
            })??;

        let universe = LabelUniverse::from(values);
        debug!(count = universe.len(), "label universe published");
        self.universe.send_replace(universe.clone());
        Ok(universe)
    }

    /// Refresh every `interval` until `token` is cancelled.
    ///
    /// The first refresh happens one interval after the call; the initial discovery is
    /// expected to have been done synchronously at startup.
    pub async fn run(self: Arc<Self>, interval: Duration, token: CancellationToken) {
        info!(routine = "labels", interval_secs = interval.as_secs(), "label discovery started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if let Err(e) = self.refresh().await {
                warn!(routine = "labels", "error when getting all labels: {e}");
            }
        }
        info!(routine = "labels", "label discovery stopped");
    }
}
