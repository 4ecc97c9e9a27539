use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use promfed_model::Sample;
use reqwest::{Certificate, Client, Identity, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::{
    api::UpstreamApi,
    config::{ClientTls, UpstreamConfig},
    errors::UpstreamError,
    wire::{ApiResponse, QueryData},
};

/// [`UpstreamApi`] over the Prometheus-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    base: Url,
    query_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, UpstreamError> {
        cfg.validate()?;
        let base = Url::parse(&cfg.endpoint)
            .map_err(|e| UpstreamError::InvalidEndpoint(format!("{}: {e}", cfg.endpoint)))?;
        if base.cannot_be_a_base() {
            return Err(UpstreamError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let builder = Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .tcp_keepalive(cfg.keepalive);
        let client = apply_tls(builder, &cfg.tls)?.build()?;

        Ok(Self {
            client,
            base,
            query_timeout: cfg.query_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, UpstreamError> {
        trace!(%url, "upstream request");
        let response = self
            .client
            .get(url)
            .timeout(self.query_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(parsed) => parsed.into_result(),
            Err(_) if !status.is_success() => Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(UpstreamError::InvalidResponse(format!(
                "failed to parse response: {e}, body: {body}"
            ))),
        }
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn label_values(&self, label: &str) -> Result<Vec<String>, UpstreamError> {
        let url = self.api_url(&["label", label, "values"])?;
        let values: Vec<String> = self.get(url).await?;
        debug!(label, count = values.len(), "label values received");
        Ok(values)
    }

    async fn instant_query(
        &self,
        expr: &str,
        at: SystemTime,
    ) -> Result<Vec<Sample>, UpstreamError> {
        let mut url = self.api_url(&["query"])?;
        url.query_pairs_mut()
            .append_pair("query", expr)
            .append_pair("time", &format_time(at));

        let data: QueryData = self.get(url).await?;
        data.into_samples()
    }
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &ClientTls,
) -> Result<reqwest::ClientBuilder, UpstreamError> {
    for pem in tls.ca_pool.iter().filter(|pem| !pem.trim().is_empty()) {
        let certs = Certificate::from_pem_bundle(pem.as_bytes())
            .map_err(|e| UpstreamError::Tls(format!("ca pool entry: {e}")))?;
        if certs.is_empty() {
            return Err(UpstreamError::Tls(
                "ca pool entry contains no certificate".into(),
            ));
        }
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    if let Some(identity) = tls.identity.as_ref().filter(|pem| !pem.is_empty()) {
        let identity = Identity::from_pem(&identity.to_bundle())
            .map_err(|e| UpstreamError::Tls(format!("client identity: {e}")))?;
        builder = builder.identity(identity);
    }

    if tls.skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }
    Ok(builder)
}

/// Unix seconds with millisecond precision, the format `/api/v1/query` expects.
fn format_time(at: SystemTime) -> String {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:03}", since.as_secs(), since.subsec_millis())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Router,
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
    };
    use promfed_model::TlsPem;
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn upstream(endpoint: String) -> HttpUpstream {
        HttpUpstream::new(&UpstreamConfig {
            endpoint,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn label_values_hits_label_endpoint() {
        let router = Router::new().route(
            "/api/v1/label/{name}/values",
            get(|Path(name): Path<String>| async move {
                assert_eq!(name, "__name__");
                r#"{"status":"success","data":["up","cpu_usage"]}"#
            }),
        );
        let api = upstream(serve(router).await);

        let values = api.label_values("__name__").await.unwrap();
        assert_eq!(values, vec!["up", "cpu_usage"]);
    }

    #[tokio::test]
    async fn instant_query_sends_expression_and_time() {
        let router = Router::new().route(
            "/api/v1/query",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["query"], "up");
                assert_eq!(params["time"], "1000.500");
                r#"{"status":"success","data":{"resultType":"vector","result":[
                    {"metric":{"__name__":"up","job":"b"},"value":[1000.5,"1"]}
                ]}}"#
            }),
        );
        let api = upstream(serve(router).await);
        let at = UNIX_EPOCH + Duration::from_millis(1_000_500);

        let samples = api.instant_query("up", at).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp_ms, 1_000_500);
        assert_eq!(samples[0].labels["job"], "b");
    }

    #[tokio::test]
    async fn base_path_is_preserved() {
        let router = Router::new().route(
            "/prefix/api/v1/label/{name}/values",
            get(|| async { r#"{"status":"success","data":["x"]}"# }),
        );
        let api = upstream(format!("{}/prefix/", serve(router).await));

        assert_eq!(api.label_values("__name__").await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn api_error_body_on_bad_status_is_reported() {
        let router = Router::new().route(
            "/api/v1/query",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    r#"{"status":"error","errorType":"bad_data","error":"invalid expression"}"#,
                )
            }),
        );
        let api = upstream(serve(router).await);

        let err = api.instant_query("up{", SystemTime::now()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Api { error_type, .. } if error_type == "bad_data"));
    }

    #[tokio::test]
    async fn plain_text_failure_keeps_status() {
        let router = Router::new().route(
            "/api/v1/query",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let api = upstream(serve(router).await);

        let err = api.instant_query("up", SystemTime::now()).await.unwrap_err();
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = upstream(format!("http://{addr}"));
        let err = api.label_values("__name__").await.unwrap_err();
        assert!(matches!(err, UpstreamError::HttpRequest(_)));
    }

    #[test]
    fn garbage_identity_is_rejected() {
        let cfg = UpstreamConfig {
            tls: ClientTls {
                identity: Some(TlsPem {
                    cert_chain: "not a cert".into(),
                    private_key: "not a key".into(),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(HttpUpstream::new(&cfg), Err(UpstreamError::Tls(_))));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let cfg = UpstreamConfig {
            endpoint: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpUpstream::new(&cfg),
            Err(UpstreamError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn time_has_millisecond_precision() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_042);
        assert_eq!(format_time(at), "1700000000.042");
    }
}
