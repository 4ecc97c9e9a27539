pub mod error;
pub use error::CoreError;

pub mod family;

pub mod cache;
pub use cache::MetricCache;

pub mod transform;
pub use transform::MetricTransformer;

pub mod discover;
pub use discover::{LabelDiscoverer, UniverseReader};

pub mod fetch;
pub use fetch::{CycleReport, FetchScheduler, FetcherConfig, WorkerPool};

pub mod engine;
pub use engine::{EngineConfig, FederationEngine};

pub use prometheus::proto::{MetricFamily, MetricType};

#[cfg(test)]
pub(crate) mod testing;
