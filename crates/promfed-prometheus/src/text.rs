//! Text exposition (version 0.0.4) for untyped families.

use std::fmt::Write as _;

use prometheus::proto::{Metric, MetricFamily, MetricType};

/// Write `family` in text format to `out`.
///
/// Families of other types are rejected; the cache only ever holds untyped ones.
pub(crate) fn write_family(family: &MetricFamily, out: &mut String) -> Result<(), prometheus::Error> {
    let name = family.name();
    if name.is_empty() {
        return Err(prometheus::Error::Msg("metric family has no name".into()));
    }
    if family.metric.is_empty() {
        return Err(prometheus::Error::Msg(format!("metric family {name} has no metrics")));
    }
    if family.type_() != MetricType::UNTYPED {
        return Err(prometheus::Error::Msg(format!(
            "metric family {name} has unsupported type {:?}",
            family.type_()
        )));
    }

    if !family.help().is_empty() {
        let _ = writeln!(out, "# HELP {name} {}", escape_help(family.help()));
    }
    let _ = writeln!(out, "# TYPE {name} untyped");
    for metric in &family.metric {
        write_sample(name, metric, out);
    }
    Ok(())
}

fn write_sample(name: &str, metric: &Metric, out: &mut String) {
    out.push_str(name);
    let mut labels = metric.label.iter().filter(|pair| !pair.name().is_empty()).peekable();
    if labels.peek().is_some() {
        out.push('{');
        for (i, pair) in labels.enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", pair.name(), escape_label_value(pair.value()));
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(&format_value(metric.untyped.value()));
    if metric.has_timestamp_ms() {
        let _ = write!(out, " {}", metric.timestamp_ms());
    }
    out.push('\n');
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', r"\\").replace('\n', r"\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}
