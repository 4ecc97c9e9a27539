use std::collections::BTreeMap;

use promfed_model::{Sample, TimestampMs};
use serde::Deserialize;

use crate::errors::UpstreamError;

/// Envelope shared by every `/api/v1` endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub(crate) enum ApiResponse<T> {
    Success {
        data: T,
    },
    Error {
        #[serde(rename = "errorType", default)]
        error_type: String,
        #[serde(default)]
        error: String,
    },
}

impl<T> ApiResponse<T> {
    pub(crate) fn into_result(self) -> Result<T, UpstreamError> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { error_type, error } => {
                Err(UpstreamError::Api { error_type, error })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VectorSample {
    pub metric: BTreeMap<String, String>,
    pub value: (f64, String),
}

impl QueryData {
    pub(crate) fn into_samples(self) -> Result<Vec<Sample>, UpstreamError> {
        if self.result_type != "vector" {
            return Err(UpstreamError::UnexpectedResultType(self.result_type));
        }
        let vector: Vec<VectorSample> = serde_json::from_value(self.result)
            .map_err(|e| UpstreamError::InvalidResponse(format!("malformed vector: {e}")))?;

        vector.into_iter().map(VectorSample::into_sample).collect()
    }
}

impl VectorSample {
    fn into_sample(self) -> Result<Sample, UpstreamError> {
        let (seconds, raw) = self.value;
        let value = parse_value(&raw)?;
        Ok(Sample::new(self.metric, seconds_to_ms(seconds), value))
    }
}

fn seconds_to_ms(seconds: f64) -> TimestampMs {
    (seconds * 1000.0).round() as TimestampMs
}

fn parse_value(raw: &str) -> Result<f64, UpstreamError> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        _ => raw
            .parse()
            .map_err(|_| UpstreamError::InvalidResponse(format!("invalid sample value: {raw:?}"))),
    }
}
