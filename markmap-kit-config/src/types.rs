//! Small enums shared by the configuration sections.

use serde::{Deserialize, Serialize};

/// `log_level` in `config.yaml`.
///
/// Lowest-precedence source for the debug log: `--log-level` wins, then a
/// plain-level `RUST_LOG`. At `off` no log file is opened at all, which is
/// the default so a normal `markmap-kit export` leaves nothing in the temp dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    /// Renderer crashes, unwritable export directories
    Error,
    /// Also dropped renderer signals and export retries
    Warn,
    /// Also one line per saved diagram
    Info,
    /// Also bridge state changes and renderer stderr
    Debug,
    /// Every renderer signal
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_yaml_names() {
        let level: LogLevel = serde_yaml_ng::from_str("trace").unwrap();
        assert_eq!(level, LogLevel::Trace);
        assert_eq!(level.to_level_filter(), log::LevelFilter::Trace);
        assert_eq!(serde_yaml_ng::to_string(&LogLevel::Warn).unwrap().trim(), "warn");
        assert!(serde_yaml_ng::from_str::<LogLevel>("Verbose").is_err());
    }
}
