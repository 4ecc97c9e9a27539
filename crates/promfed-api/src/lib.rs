mod error;
pub use error::ApiError;

mod query;
pub use query::parse_filter;

mod http;
pub use http::MetricsApi;

pub use axum;
