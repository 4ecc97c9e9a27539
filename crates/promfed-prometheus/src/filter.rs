use std::{borrow::Cow, collections::HashSet};

use prometheus::proto::MetricFamily;

use promfed_core::family::label_value;
use promfed_model::SOURCE_ID_LABEL;

/// Allow-lists applied to cached families before encoding.
///
/// `None` means the corresponding filter was not requested; an empty set filters
/// everything out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyFilter {
    pub metrics: Option<HashSet<String>>,
    pub source_ids: Option<HashSet<String>>,
}

impl FamilyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics
            .get_or_insert_with(HashSet::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_source_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_ids
            .get_or_insert_with(HashSet::new)
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Family to emit for the cache entry `name`, or `None` to skip it.
    ///
    /// A family left without metrics by the source-id filter is skipped.
    pub fn apply<'a>(&self, name: &str, family: &'a MetricFamily) -> Option<Cow<'a, MetricFamily>> {
        if let Some(metrics) = &self.metrics
            && !metrics.contains(name)
        {
            return None;
        }

        let family = match &self.source_ids {
            Some(ids) => Cow::Owned(filter_by_source_ids(family, ids)),
            None => Cow::Borrowed(family),
        };
        if family.metric.is_empty() {
            return None;
        }
        Some(family)
    }
}

/// Copy of `family` keeping only metrics whose `source_id` label is in `ids`.
pub(crate) fn filter_by_source_ids(family: &MetricFamily, ids: &HashSet<String>) -> MetricFamily {
    let mut filtered = MetricFamily::default();
    filtered.set_name(family.name().to_string());
    filtered.set_help(family.help().to_string());
    filtered.set_type(family.type_());
    filtered.metric = family
        .metric
        .iter()
        .filter(|metric| label_value(metric, SOURCE_ID_LABEL).is_some_and(|id| ids.contains(id)))
        .cloned()
        .collect();
    filtered
}
