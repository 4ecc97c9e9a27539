use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use promfed_model::LabelUniverse;
use promfed_upstream::UpstreamApi;

use crate::{
    cache::MetricCache,
    discover::LabelDiscoverer,
    error::CoreError,
    fetch::{FetchScheduler, FetcherConfig},
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fetcher: FetcherConfig,
    /// Pause between label discoveries (default: 5 minutes).
    pub label_interval: Duration,
    /// Deadline for a single discovery call (default: 50 seconds).
    pub label_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            label_interval: Duration::from_secs(300),
            label_timeout: Duration::from_secs(50),
        }
    }
}

/// Running discovery and fetch loops feeding a shared cache.
pub struct FederationEngine {
    cache: MetricCache,
    discoverer: Arc<LabelDiscoverer>,
    token: CancellationToken,
    loops: Vec<JoinHandle<()>>,
}

impl FederationEngine {
    /// Discover labels once, then start both background loops.
    ///
    /// Fails without spawning anything if the configuration is invalid or the first
    /// discovery does not succeed. The loops stop when `token` (or [`Self::shutdown`]) cancels.
    pub async fn start(
        cfg: EngineConfig,
        upstream: Arc<dyn UpstreamApi>,
        cache: MetricCache,
        token: CancellationToken,
    ) -> Result<Self, CoreError> {
        cfg.fetcher.validate()?;
        if cfg.label_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "label interval must be positive".into(),
            ));
        }

        let discoverer = Arc::new(LabelDiscoverer::new(
            Arc::clone(&upstream),
            cfg.label_timeout,
        ));
        let universe = discoverer.refresh().await?;
        info!(labels = universe.len(), "initial label discovery complete");

        let scheduler =
            FetchScheduler::new(cfg.fetcher, upstream, cache.clone(), discoverer.reader())?;

        let token = token.child_token();
        let loops = vec![
            tokio::spawn(Arc::clone(&discoverer).run(cfg.label_interval, token.clone())),
            tokio::spawn(scheduler.run(token.clone())),
        ];

        Ok(Self {
            cache,
            discoverer,
            token,
            loops,
        })
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    /// Label universe currently used for fetch cycles.
    pub fn labels(&self) -> LabelUniverse {
        self.discoverer.current()
    }

    /// Stop both loops and wait for in-flight queries to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for handle in self.loops {
            if let Err(e) = handle.await {
                warn!("background loop terminated abnormally: {e}");
            }
        }
        info!("federation engine stopped");
    }
}
