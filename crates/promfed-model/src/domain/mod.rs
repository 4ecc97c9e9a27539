mod constants;
pub use constants::{METRIC_NAME_LABEL, SOURCE_ID_LABEL};

mod sample;
pub use sample::Sample;

mod universe;
pub use universe::LabelUniverse;

mod namespace;
pub use namespace::MetricNamespace;

mod tls;
pub use tls::TlsPem;

/// Metric name as used for cache keys and query expressions.
pub type MetricName = String;

/// Timestamp in milliseconds since the unix epoch.
pub type TimestampMs = i64;
