use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("failed to connect to journald: {0}")]
    Journald(#[source] std::io::Error),
    #[error("invalid log level {directive:?}: {reason}")]
    InvalidLogLevel { directive: String, reason: String },
}
