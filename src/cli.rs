//! Command-line interface for markmap-kit.
//!
//! Subcommands:
//! - `extract` - split message text into text and diagram parts
//! - `page` - write the HTML page script-capable renderers load
//! - `save` - decode a renderer export payload into a PNG file
//! - `export` - render every diagram in a message through the configured
//!   renderer process and save the results

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use markmap_kit_bridge::{ArtifactWriter, markmap_page};
use markmap_kit_config::Config;
use markmap_kit_extract::{Message, MessagePart};
use tokio::runtime::Runtime;

use crate::pipeline::{self, ExportSettings};

/// markmap-kit - pull markmap diagrams out of chat messages and export them
#[derive(Parser, Debug)]
#[command(name = "markmap-kit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Use this config file instead of ~/.config/markmap-kit/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split message text into text and diagram parts
    Extract {
        /// Message file (reads stdin when omitted or "-")
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Write the renderer HTML page
    Page {
        /// Destination file (stdout when omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decode a renderer export payload (base64 or data URL) into a PNG file
    Save {
        /// Payload file (reads stdin when omitted or "-")
        input: Option<PathBuf>,

        /// Directory to write to (defaults to the configured output directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Render and save every diagram in a message
    Export {
        /// Message file (reads stdin when omitted or "-")
        input: Option<PathBuf>,

        /// Renderer program (overrides renderer.command)
        #[arg(long, value_name = "PROGRAM")]
        renderer: Option<String>,

        /// Directory to write to (defaults to the configured output directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Extra export attempts when the renderer reports an export failure
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON array of parts
    Json,
    /// Human-readable listing
    Text,
}

/// Load the config named on the command line, or the default one.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

/// Run the parsed command. Returns the process exit code.
pub fn run(cli: Cli, config: Config, runtime: &Runtime) -> Result<i32> {
    match cli.command {
        Commands::Extract { input, format } => {
            let text = read_input(input.as_deref())?;
            let message = Message::from_text(text).extracted();
            let mut stdout = io::stdout().lock();
            write_parts(&mut stdout, &message.parts, format)?;
            Ok(0)
        }
        Commands::Page { output } => {
            match output {
                Some(path) => std::fs::write(&path, markmap_page())
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => io::stdout().write_all(markmap_page().as_bytes())?,
            }
            Ok(0)
        }
        Commands::Save { input, output_dir } => {
            let payload = read_input(input.as_deref())?;
            let writer = ArtifactWriter::new(output_dir.unwrap_or_else(|| config.output_dir()))
                .with_prefix(config.export.file_prefix.clone());
            let path = writer.persist(&payload)?;
            println!("{}", path.display());
            Ok(0)
        }
        Commands::Export {
            input,
            renderer,
            output_dir,
            retries,
        } => {
            let text = read_input(input.as_deref())?;
            let mut config = config;
            if renderer.is_some() {
                config.renderer.command = renderer;
            }
            let mut settings = ExportSettings::from_config(&config).context(
                "Set renderer.command in the config file or pass --renderer <PROGRAM>",
            )?;
            settings.retries = retries;
            if let Some(dir) = output_dir {
                settings.writer = ArtifactWriter::new(dir)
                    .with_prefix(config.export.file_prefix.clone());
            }
            export(&Message::from_text(text), &settings, runtime)
        }
    }
}

fn export(message: &Message, settings: &ExportSettings, runtime: &Runtime) -> Result<i32> {
    let exports = runtime.block_on(pipeline::export_message(message, settings));

    if exports.is_empty() {
        eprintln!("No markmap diagrams found");
        return Ok(1);
    }

    let mut failed = 0;
    for export in exports {
        match export.result {
            Ok(path) => println!("{}", path.display()),
            Err(e) => {
                failed += 1;
                eprintln!("diagram {}: {e}", export.index + 1);
            }
        }
    }
    Ok(if failed == 0 { 0 } else { 1 })
}

/// Read a whole file, or stdin when `path` is `None` or `-`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Print extracted parts in the requested format.
pub fn write_parts(out: &mut impl Write, parts: &[MessagePart], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, parts)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for part in parts {
                match part {
                    MessagePart::Text { content } => writeln!(out, "[text]\n{content}")?,
                    MessagePart::Diagram { spec } => writeln!(out, "[diagram]\n{spec}")?,
                }
            }
        }
    }
    Ok(())
}
