use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, fmt::time::OffsetTime, layer::Layered, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

type Filtered = Layered<EnvFilter, Registry>;

/// Build the subscriber for `cfg` and install it globally.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filtered = tracing_subscriber::registry().with(cfg.level.filter()?);

    match cfg.format {
        LoggerFormat::Text => filtered
            .with(
                fmt::layer()
                    .with_ansi(cfg.use_color)
                    .with_target(cfg.with_targets)
                    .with_timer(local_timer()),
            )
            .try_init(),
        LoggerFormat::Json => filtered
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_timer(local_timer()),
            )
            .try_init(),
        LoggerFormat::Journald => return journald(filtered),
    }
    // try_init only fails when a global subscriber or log logger is already set
    .map_err(|_| LoggerError::AlreadyInitialized)
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(filtered: Filtered) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer().map_err(LoggerError::Journald)?;
    filtered
        .with(layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_filtered: Filtered) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
