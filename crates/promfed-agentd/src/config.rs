use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use promfed_core::{EngineConfig, FetcherConfig};
use promfed_model::{MetricNamespace, TlsPem};
use promfed_observe::{LoggerConfig, LoggerLevel};
use promfed_upstream::{ClientTls, UpstreamConfig};

const DEFAULT_WORKERS: usize = 50;

#[derive(Debug, Parser)]
#[command(name = "promfed-agentd", about = "Federating Prometheus metric cache")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid TLS material: {0}")]
    InvalidTls(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: LoggerLevel,
    pub no_color: bool,
    pub in_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub connect_timeout_secs: u64,
    pub keepalive_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            keepalive_secs: 30,
        }
    }
}

/// On-disk service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub metric_store_api: String,
    pub skip_ssl_validation: bool,
    pub ca_pool: Vec<String>,
    pub metric_store_mtls: TlsPem,
    pub ssl_certificate: TlsPem,
    pub enable_ssl: bool,
    pub port: u16,
    /// Values `<= 0` select the default of 50.
    pub nb_workers: i64,
    pub metric_namespace: MetricNamespace,
    pub log: LogSection,
    pub label_interval_secs: u64,
    pub fetch_interval_secs: u64,
    pub query_timeout_secs: u64,
    pub refresh_labels_each_cycle: bool,
    pub upstream: UpstreamSection,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            metric_store_api: "https://localhost:8080".to_string(),
            skip_ssl_validation: false,
            ca_pool: Vec::new(),
            metric_store_mtls: TlsPem::default(),
            ssl_certificate: TlsPem::default(),
            enable_ssl: false,
            port: 8086,
            nb_workers: 0,
            metric_namespace: MetricNamespace::default(),
            log: LogSection::default(),
            label_interval_secs: 300,
            fetch_interval_secs: 60,
            query_timeout_secs: 50,
            refresh_labels_each_cycle: true,
            upstream: UpstreamSection::default(),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("label_interval_secs", self.label_interval_secs),
            ("fetch_interval_secs", self.fetch_interval_secs),
            ("query_timeout_secs", self.query_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be positive".into(),
                });
            }
        }
        if self.metric_store_api.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "metric_store_api",
                reason: "must not be empty".into(),
            });
        }
        if self.enable_ssl && self.ssl_certificate.is_empty() {
            return Err(ConfigError::InvalidTls(
                "enable_ssl is set but ssl_certificate is empty".into(),
            ));
        }
        Ok(())
    }

    pub fn workers(&self) -> usize {
        usize::try_from(self.nb_workers)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_WORKERS)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        let identity = (!self.metric_store_mtls.is_empty()).then(|| self.metric_store_mtls.clone());
        UpstreamConfig {
            endpoint: self.metric_store_api.clone(),
            query_timeout: self.query_timeout(),
            connect_timeout: Duration::from_secs(self.upstream.connect_timeout_secs),
            keepalive: Duration::from_secs(self.upstream.keepalive_secs),
            tls: ClientTls {
                skip_verify: self.skip_ssl_validation,
                ca_pool: self.ca_pool.clone(),
                identity,
            },
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fetcher: FetcherConfig {
                workers: self.workers(),
                interval: Duration::from_secs(self.fetch_interval_secs),
                query_timeout: self.query_timeout(),
                namespace: self.metric_namespace.clone(),
                refresh_labels_each_cycle: self.refresh_labels_each_cycle,
            },
            label_interval: Duration::from_secs(self.label_interval_secs),
            label_timeout: self.query_timeout(),
        }
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig::from_switches(self.log.level.clone(), self.log.no_color, self.log.in_json)
    }
}
