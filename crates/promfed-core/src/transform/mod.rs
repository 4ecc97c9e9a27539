use prometheus::proto::{Metric, MetricFamily};
use tracing::{debug, trace};

use promfed_model::{MetricNamespace, Sample};

use crate::family::{label_pair, untyped_family, untyped_metric};

/// Turns an instant-query vector into a metric family.
#[derive(Debug, Clone, Default)]
pub struct MetricTransformer {
    namespace: MetricNamespace,
}

impl MetricTransformer {
    pub fn new(namespace: MetricNamespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &MetricNamespace {
        &self.namespace
    }

    /// Build the family for the vector returned by querying `metric_name`.
    ///
    /// Samples without a name are dropped. Consecutive samples sharing a name form one
    /// family; when the name changes a new family is started and only the last one is
    /// returned. `None` means nothing should be written to the cache.
    pub fn transform(&self, metric_name: &str, samples: &[Sample]) -> Option<MetricFamily> {
        let mut current: Option<(String, Vec<Metric>)> = None;

        for sample in samples {
            let Some(name) = sample.name() else {
                debug!(metric_name, labels = ?sample.labels, "ignoring nameless sample");
                continue;
            };
            let family_name = self.namespace.qualify(name);

            match current.as_mut() {
                Some((current_name, metrics)) if *current_name == family_name => {
                    metrics.push(to_metric(sample));
                }
                _ => {
                    if let Some((previous, _)) = &current {
                        trace!(metric_name, previous = %previous, next = %family_name, "vector switched family");
                    }
                    current = Some((family_name, vec![to_metric(sample)]));
                }
            }
        }

        current.map(|(name, metrics)| untyped_family(&name, metrics))
    }
}

fn to_metric(sample: &Sample) -> Metric {
    let labels = sample
        .series_labels()
        .map(|(name, value)| label_pair(name, value))
        .collect();
    untyped_metric(labels, sample.timestamp_ms, sample.value)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use prometheus::proto::MetricType;

    use super::*;
    use crate::family::label_value;

    fn sample(pairs: &[(&str, &str)], timestamp_ms: i64, value: f64) -> Sample {
        let labels: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Sample::new(labels, timestamp_ms, value)
    }

    #[test]
    fn single_sample_becomes_family() {
        let transformer = MetricTransformer::default();
        let family = transformer
            .transform(
                "up",
                &[sample(
                    &[("__name__", "up"), ("instance", "a"), ("job", "b")],
                    1_000,
                    1.0,
                )],
            )
            .expect("family expected");

        assert_eq!(family.name(), "up");
        assert_eq!(family.type_(), MetricType::UNTYPED);
        assert_eq!(family.metric.len(), 1);

        let metric = &family.metric[0];
        assert_eq!(metric.label.len(), 2);
        assert_eq!(metric.label[0].name(), "instance");
        assert_eq!(metric.label[1].name(), "job");
        assert_eq!(metric.timestamp_ms(), 1_000);
        assert_eq!(metric.untyped.value(), 1.0);
    }

    #[test]
    fn same_name_samples_share_family() {
        let transformer = MetricTransformer::default();
        let family = transformer
            .transform(
                "up",
                &[
                    sample(&[("__name__", "up"), ("instance", "a")], 1, 1.0),
                    sample(&[("__name__", "up"), ("instance", "b")], 2, 0.0),
                ],
            )
            .unwrap();

        assert_eq!(family.metric.len(), 2);
        assert_eq!(label_value(&family.metric[1], "instance"), Some("b"));
    }

    #[test]
    fn nameless_samples_are_dropped() {
        let transformer = MetricTransformer::default();
        let out = transformer.transform(
            "up",
            &[
                sample(&[("job", "b")], 1, 1.0),
                sample(&[("__name__", ""), ("job", "b")], 1, 1.0),
            ],
        );
        assert!(out.is_none());
    }

    #[test]
    fn empty_vector_yields_nothing() {
        assert!(MetricTransformer::default().transform("up", &[]).is_none());
    }

    #[test]
    fn empty_label_values_are_unset() {
        let family = MetricTransformer::default()
            .transform(
                "up",
                &[sample(&[("__name__", "up"), ("job", "b"), ("zone", "")], 1, 1.0)],
            )
            .unwrap();

        assert_eq!(family.metric[0].label.len(), 1);
        assert_eq!(label_value(&family.metric[0], "zone"), None);
    }

    #[test]
    fn namespace_prefixes_family_name() {
        let transformer = MetricTransformer::new(MetricNamespace::new("fed_"));
        let family = transformer
            .transform(
                "up",
                &[
                    sample(&[("__name__", "up"), ("instance", "a")], 1, 1.0),
                    sample(&[("__name__", "up"), ("instance", "b")], 1, 1.0),
                ],
            )
            .unwrap();

        assert_eq!(family.name(), "fed_up");
        assert_eq!(family.metric.len(), 2);
    }

    #[test]
    fn multi_name_vector_keeps_last_family() {
        let family = MetricTransformer::default()
            .transform(
                "mixed",
                &[
                    sample(&[("__name__", "a"), ("k", "1")], 1, 1.0),
                    sample(&[("__name__", "a"), ("k", "2")], 1, 2.0),
                    sample(&[("__name__", "b"), ("k", "3")], 1, 3.0),
                    sample(&[("job", "nameless")], 1, 4.0),
                ],
            )
            .unwrap();

        assert_eq!(family.name(), "b");
        assert_eq!(family.metric.len(), 1);
        assert_eq!(family.metric[0].untyped.value(), 3.0);
    }

    #[test]
    fn returning_name_starts_fresh_family() {
        let family = MetricTransformer::default()
            .transform(
                "mixed",
                &[
                    sample(&[("__name__", "a")], 1, 1.0),
                    sample(&[("__name__", "b")], 1, 2.0),
                    sample(&[("__name__", "a")], 1, 3.0),
                ],
            )
            .unwrap();

        assert_eq!(family.name(), "a");
        assert_eq!(family.metric.len(), 1);
        assert_eq!(family.metric[0].untyped.value(), 3.0);
    }
}
