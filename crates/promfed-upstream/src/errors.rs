use thiserror::Error;

/// Failure of a single discovery or query call.
///
/// Every variant is transient from the engine's point of view: the call is logged and retried on the next cycle.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream api error ({error_type}): {error}")]
    Api { error_type: String, error: String },

    #[error("unexpected result type: {0} (expected vector)")]
    UnexpectedResultType(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid tls material: {0}")]
    Tls(String),
}
