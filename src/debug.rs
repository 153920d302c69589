//! Logging backend for markmap-kit
//!
//! Routes every `log::info!()` / `log::debug!()` etc. from all workspace
//! crates into a debug log file:
//! - /tmp/markmap_kit_debug.log on Unix/macOS
//! - %TEMP%\markmap_kit_debug.log on Windows
//!
//! Level precedence: `--log-level` CLI flag, then `RUST_LOG`, then the
//! `log_level` config value. When `RUST_LOG` is set, records are mirrored to
//! stderr as well. Stdout stays clean for command output.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

/// Global debug logger
struct DebugLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn new(level: LevelFilter, mirror_stderr: bool) -> Self {
        let file = if level != LevelFilter::Off {
            match OpenOptions::new()
                .write(true)
                .truncate(true)
                .create(true)
                .open(log_path())
            {
                Ok(mut f) => {
                    // Write header
                    let _ = f.write_all(
                        format!(
                            "\n{}\nmarkmap-kit debug session started at {} (level={})\n{}\n",
                            "=".repeat(80),
                            timestamp(),
                            level,
                            "=".repeat(80)
                        )
                        .as_bytes(),
                    );
                    Some(Mutex::new(f))
                }
                // Silently fall back to stderr-only (or nothing)
                Err(_) => None,
            }
        } else {
            None
        };

        Self {
            level,
            file,
            mirror_stderr,
        }
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(&timestamp(), record);
        if let Some(file) = &self.file {
            let mut file = file.lock();
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

static LOGGER: OnceLock<DebugLogger> = OnceLock::new();

/// Path of the debug log file.
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp/markmap_kit_debug.log")
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join("markmap_kit_debug.log")
    }
}

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

fn format_record(timestamp: &str, record: &Record) -> String {
    format!(
        "[{}] [{:<5}] [{}] {}\n",
        timestamp,
        record.level(),
        record.target(),
        record.args()
    )
}

/// Resolve the effective level from the CLI flag, `RUST_LOG` and config.
pub fn resolve_level(
    cli_level: Option<LevelFilter>,
    rust_log: Option<&str>,
    config_level: LevelFilter,
) -> LevelFilter {
    cli_level
        .or_else(|| rust_log.and_then(|value| LevelFilter::from_str(value.trim()).ok()))
        .unwrap_or(config_level)
}

/// Install the logger. Safe to call more than once; only the first call
/// takes effect.
pub fn init_log_bridge(cli_level: Option<LevelFilter>, config_level: LevelFilter) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = resolve_level(cli_level, rust_log.as_deref(), config_level);
    let logger = LOGGER.get_or_init(|| DebugLogger::new(level, rust_log.is_some()));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.level);
    }
}
