use std::collections::BTreeMap;

use crate::{METRIC_NAME_LABEL, TimestampMs};

/// One series observation returned by an instant query.
///
/// Labels include the reserved [`METRIC_NAME_LABEL`]; empty label values mean "unset".
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    pub timestamp_ms: TimestampMs,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: BTreeMap<String, String>, timestamp_ms: TimestampMs, value: f64) -> Self {
        Self {
            labels,
            timestamp_ms,
            value,
        }
    }

    /// Value of the reserved name label, `None` when absent or empty.
    pub fn name(&self) -> Option<&str> {
        self.labels
            .get(METRIC_NAME_LABEL)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Labels that end up on an exported metric: everything but the name label, skipping unset values.
    pub fn series_labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels
            .iter()
            .filter(|(name, value)| name.as_str() != METRIC_NAME_LABEL && !value.is_empty())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
