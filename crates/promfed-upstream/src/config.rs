use std::time::Duration;

use promfed_model::TlsPem;

use crate::errors::UpstreamError;

/// TLS settings for outbound connections to the upstream.
#[derive(Debug, Clone, Default)]
pub struct ClientTls {
    /// Accept any server certificate.
    pub skip_verify: bool,
    /// Extra PEM roots added on top of the built-in trust store. Blank entries are ignored.
    pub ca_pool: Vec<String>,
    /// Client identity presented for mutual TLS.
    pub identity: Option<TlsPem>,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (e.g. `https://metric-store:8080`).
    pub endpoint: String,
    /// Deadline for a single label or query call (default: 50 seconds).
    pub query_timeout: Duration,
    /// TCP connect timeout (default: 30 seconds).
    pub connect_timeout: Duration,
    /// TCP keepalive interval (default: 30 seconds).
    pub keepalive: Duration,
    pub tls: ClientTls,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:8080".to_string(),
            query_timeout: Duration::from_secs(50),
            connect_timeout: Duration::from_secs(30),
            keepalive: Duration::from_secs(30),
            tls: ClientTls::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), UpstreamError> {
        if self.endpoint.trim().is_empty() {
            return Err(UpstreamError::InvalidEndpoint("endpoint is empty".into()));
        }
        if self.query_timeout.is_zero() {
            return Err(UpstreamError::InvalidEndpoint(
                "query timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}
