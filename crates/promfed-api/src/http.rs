use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Uri, header},
    response::IntoResponse,
    routing::get,
};
use tracing::debug;

use promfed_core::MetricCache;
use promfed_prometheus::{ExpositionFormat, render};

use crate::{ApiError, query::parse_filter};

/// Scrape endpoint over a [`MetricCache`].
pub struct MetricsApi {
    cache: MetricCache,
}

impl MetricsApi {
    pub fn new(cache: MetricCache) -> Self {
        Self { cache }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET /metrics - Exposition of every cached family, optionally filtered by
    ///   `metric[]` and `source_id[]`
    pub fn router(self) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .with_state(self.cache)
    }
}

/// GET /metrics
async fn scrape(
    State(cache): State<MetricCache>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter(&uri)?;
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let format = ExpositionFormat::negotiate(accept);
    debug!(?format, ?filter, "scrape");

    let body = render(&cache, &filter, format);
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()))],
        body,
    ))
}
