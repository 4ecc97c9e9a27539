mod config;
mod error;
mod format;
mod level;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Install the global subscriber described by `cfg`.
///
/// Only the first successful call in a process takes effect; later calls return
/// [`LoggerError::AlreadyInitialized`].
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        let cfg = LoggerConfig {
            level: "debug".parse().unwrap(),
            use_color: false,
            ..LoggerConfig::default()
        };
        logger_init(&cfg).unwrap();
        tracing::info!(component = "observe", "logger installed");

        let err = logger_init(&cfg).unwrap_err();
        assert!(matches!(err, LoggerError::AlreadyInitialized));
    }
}
