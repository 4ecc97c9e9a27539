use std::time::Duration;

use promfed_upstream::UpstreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("upstream call failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}
