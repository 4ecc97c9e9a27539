use std::io::IsTerminal;

use crate::logger::{format::LoggerFormat, level::LoggerLevel};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub with_targets: bool,
    pub use_color: bool,
}

impl LoggerConfig {
    /// Config from the service switches: level, color opt-out and json output.
    pub fn from_switches(level: LoggerLevel, no_color: bool, in_json: bool) -> Self {
        Self {
            format: LoggerFormat::from_json_flag(in_json),
            level,
            use_color: !no_color && std::io::stdout().is_terminal(),
            ..Self::default()
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color,
        }
    }
}
