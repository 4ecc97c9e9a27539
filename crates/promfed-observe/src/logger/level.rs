use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer};
use tracing_subscriber::EnvFilter;

use crate::logger::error::LoggerError;

/// Validated filter directive, e.g. `info` or `warn,promfed_core=debug`.
///
/// Level names of the form `warning`, `fatal` and `panic` are accepted and mapped onto
/// the closest tracing level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn filter(&self) -> Result<EnvFilter, LoggerError> {
        EnvFilter::try_new(&self.0).map_err(|e| LoggerError::InvalidLogLevel {
            directive: self.0.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let directive = match trimmed.to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "fatal" | "panic" => "error".to_string(),
            _ => trimmed.to_string(),
        };

        let level = Self(directive);
        level.filter()?;
        Ok(level)
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LoggerLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
