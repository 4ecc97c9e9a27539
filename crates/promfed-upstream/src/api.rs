use std::time::SystemTime;

use async_trait::async_trait;
use promfed_model::Sample;

use crate::errors::UpstreamError;

/// Query capability of the upstream metrics backend.
#[async_trait]
pub trait UpstreamApi: Send + Sync + 'static {
    /// Distinct values of `label`, in the order the upstream returns them.
    async fn label_values(&self, label: &str) -> Result<Vec<String>, UpstreamError>;

    /// Evaluate `expr` at `at` and return the resulting vector.
    async fn instant_query(&self, expr: &str, at: SystemTime)
    -> Result<Vec<Sample>, UpstreamError>;
}
