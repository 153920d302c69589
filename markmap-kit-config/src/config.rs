//! The `Config` struct, its defaults, and YAML persistence.
//!
//! Lives at `~/.config/markmap-kit/config.yaml`:
//!
//! ```yaml
//! log_level: info
//! export:
//!   output_dir: ~/Pictures/Markmaps   # default: <picture dir>/MarkmapExports
//!   file_prefix: Markmap_
//! renderer:
//!   command: markmap-renderer
//!   args: []
//!   render_timeout_ms: 15000
//!   export_timeout_ms: 15000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::LogLevel;

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_app_dir_name() -> String {
    "MarkmapExports".to_string()
}

fn default_file_prefix() -> String {
    "Markmap_".to_string()
}

fn default_render_timeout_ms() -> u64 {
    15_000
}

fn default_export_timeout_ms() -> u64 {
    15_000
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where and how exported diagrams are written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Explicit output directory (`~/` is expanded). When unset, exports go
    /// to `<platform picture dir>/<app_dir_name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Sub-directory of the picture directory used when `output_dir` is unset.
    #[serde(default = "default_app_dir_name")]
    pub app_dir_name: String,

    /// File name prefix; the timestamp and `.png` follow it.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            app_dir_name: default_app_dir_name(),
            file_prefix: default_file_prefix(),
        }
    }
}

/// The external renderer process and how long to wait for it.
///
/// The bridge never times out on its own; these bounds are applied by the
/// export pipeline around each step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Program speaking the line-delimited JSON renderer protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// How long to wait for the renderer to lay out a submitted diagram.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// How long to wait for an export to come back.
    #[serde(default = "default_export_timeout_ms")]
    pub export_timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            render_timeout_ms: default_render_timeout_ms(),
            export_timeout_ms: default_export_timeout_ms(),
        }
    }
}

impl RendererConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Verbosity of the debug log file.
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub renderer: RendererConfig,
}

impl Config {
    /// Load configuration from the default path, creating a default file if
    /// none exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, creating a default file there if it
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Config path: {:?}", path);

        if !path.exists() {
            log::info!("Config file not found, creating default at {:?}", path);
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Config = serde_yaml_ng::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;

        Ok(())
    }

    /// Reject values the rest of the program cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.export.file_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "export.file_prefix must be a non-empty file name fragment, got {prefix:?}"
            )));
        }
        let app_dir = &self.export.app_dir_name;
        if app_dir.is_empty() || app_dir.contains(['/', '\\']) || app_dir == ".." {
            return Err(ConfigError::Validation(format!(
                "export.app_dir_name must be a single directory name, got {app_dir:?}"
            )));
        }
        if self.renderer.render_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "renderer.render_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.renderer.export_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "renderer.export_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory exported diagrams are written to.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.export.output_dir {
            return expand_home(dir);
        }
        let pictures = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("."));
        pictures.join(&self.export.app_dir_name)
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("markmap-kit")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("markmap-kit")
            } else {
                PathBuf::from(".")
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Off);
        assert_eq!(config.export.file_prefix, "Markmap_");
        assert_eq!(config.export.app_dir_name, "MarkmapExports");
        assert!(config.renderer.command.is_none());
        assert_eq!(config.renderer.render_timeout(), Duration::from_secs(15));
        assert!(config.output_dir().ends_with("MarkmapExports"));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml_ng::from_str(
            "log_level: debug\nrenderer:\n  command: markmap-renderer\n  args: [--headless]\n",
        )
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.renderer.command.as_deref(), Some("markmap-renderer"));
        assert_eq!(config.renderer.args, vec!["--headless".to_string()]);
        assert_eq!(config.renderer.export_timeout_ms, 15_000);
        assert_eq!(config.export, ExportConfig::default());
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.log_level = LogLevel::Info;
        config.export.output_dir = Some("/srv/markmaps".to_string());
        config.renderer.command = Some("node".to_string());
        config.renderer.args = vec!["render.js".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.output_dir(), PathBuf::from("/srv/markmaps"));
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "renderer: [not, a, map").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.export.file_prefix = "../escape".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.renderer.export_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "renderer:\n  render_timeout_ms: 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/Pictures"), home.join("Pictures"));
        }
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
