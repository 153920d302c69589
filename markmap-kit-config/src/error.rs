//! Why `config.yaml` could not be used.
//!
//! `Config::load_from` and `Config::save_to` return `anyhow::Result`. The CLI
//! only prints the chain; tests and embedders `downcast_ref::<ConfigError>()`
//! to tell a broken file from a bad value.

use std::fmt;

/// Failure reading, parsing, validating or writing `config.yaml`.
#[derive(Debug)]
pub enum ConfigError {
    /// The file or its directory under `~/.config/markmap-kit` is unreadable
    /// or unwritable.
    Io(std::io::Error),

    /// Not YAML, or a field has the wrong shape (e.g. `renderer.args` not a list).
    Parse(serde_yaml_ng::Error),

    /// Well-formed but unusable, such as a zero renderer timeout or a file
    /// prefix containing a path separator. Names the offending key.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot access config file: {e}"),
            ConfigError::Parse(e) => write!(f, "config.yaml is not valid: {e}"),
            ConfigError::Validation(msg) => write!(f, "bad config value: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(e)
    }
}
