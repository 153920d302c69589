//! Configuration system for markmap-kit.
//!
//! This crate provides configuration loading, saving, and default values:
//!
//! - Export settings (output directory, file name prefix)
//! - Renderer process command line and the caller-side timeouts around it
//! - Debug log verbosity

pub mod config;
pub mod error;
mod types;

pub use config::{Config, ExportConfig, RendererConfig};
pub use error::ConfigError;
pub use types::LogLevel;
