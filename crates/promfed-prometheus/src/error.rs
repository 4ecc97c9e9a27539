use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to encode family {family}: {source}")]
    Encode {
        family: String,
        #[source]
        source: prometheus::Error,
    },
}
