use serde::{Deserialize, Serialize};

/// Optional prefix prepended to every exported family name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricNamespace(String);

impl MetricNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family name for a series named `name` upstream.
    pub fn qualify(&self, name: &str) -> String {
        let mut out = String::with_capacity(self.0.len() + name.len());
        out.push_str(&self.0);
        out.push_str(name);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_namespace_keeps_name() {
        assert_eq!(MetricNamespace::default().qualify("up"), "up");
    }

    #[test]
    fn prefix_is_prepended_verbatim() {
        assert_eq!(MetricNamespace::new("fed_").qualify("up"), "fed_up");
    }
}
