//! Client for the upstream metrics query API.
//!
//! [`UpstreamApi`] is the capability the fetch engine consumes; [`HttpUpstream`] implements it against the Prometheus HTTP API (`/api/v1/label/<name>/values` and `/api/v1/query`).

mod api;
pub use api::UpstreamApi;

mod client;
pub use client::HttpUpstream;

mod config;
pub use config::{ClientTls, UpstreamConfig};

mod errors;
pub use errors::UpstreamError;

mod wire;
