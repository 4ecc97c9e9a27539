//! Builders for the exposition records stored in the cache.

use prometheus::proto::{LabelPair, Metric, MetricFamily, MetricType};

use promfed_model::TimestampMs;

pub fn label_pair(name: &str, value: &str) -> LabelPair {
    let mut pair = LabelPair::default();
    pair.set_name(name.to_string());
    pair.set_value(value.to_string());
    pair
}

/// Untyped data point with an explicit timestamp.
pub fn untyped_metric(labels: Vec<LabelPair>, timestamp_ms: TimestampMs, value: f64) -> Metric {
    let mut metric = Metric::default();
    metric.label = labels;
    metric.set_timestamp_ms(timestamp_ms);
    metric.untyped.mut_or_insert_default().set_value(value);
    metric
}

/// Untyped family with empty help text.
pub fn untyped_family(name: &str, metrics: Vec<Metric>) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(name.to_string());
    family.set_help(String::new());
    family.set_type(MetricType::UNTYPED);
    family.metric = metrics;
    family
}

/// Value of the label `name` on `metric`, if present.
pub fn label_value<'a>(metric: &'a Metric, name: &str) -> Option<&'a str> {
    metric
        .label
        .iter()
        .find(|pair| pair.name() == name)
        .map(|pair| pair.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_metric_carries_all_fields() {
        let metric = untyped_metric(vec![label_pair("job", "b")], 1_000, 2.5);
        assert_eq!(metric.timestamp_ms(), 1_000);
        assert_eq!(metric.untyped.value(), 2.5);
        assert_eq!(label_value(&metric, "job"), Some("b"));
        assert_eq!(label_value(&metric, "instance"), None);
    }

    #[test]
    fn untyped_family_has_untyped_marker() {
        let family = untyped_family("up", vec![untyped_metric(vec![], 0, 1.0)]);
        assert_eq!(family.name(), "up");
        assert_eq!(family.help(), "");
        assert_eq!(family.type_(), MetricType::UNTYPED);
        assert_eq!(family.metric.len(), 1);
    }
}
