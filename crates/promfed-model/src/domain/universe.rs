use std::sync::Arc;

use crate::MetricName;

/// Metric names known to the upstream, as returned by the most recent discovery.
///
/// Cloning is cheap; the list itself is immutable once published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelUniverse(Arc<[MetricName]>);

impl LabelUniverse {
    /// Create an empty universe.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over metric names in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<MetricName>> for LabelUniverse {
    fn from(names: Vec<MetricName>) -> Self {
        Self(names.into())
    }
}

impl<'a> FromIterator<&'a str> for LabelUniverse {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}
