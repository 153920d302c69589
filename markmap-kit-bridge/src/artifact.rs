//! Persisting exported images.
//!
//! The renderer hands back a base64 payload, usually as a
//! `data:image/png;base64,...` URL. [`ArtifactWriter`] decodes it and writes
//! `<prefix><yyyyMMdd_HHmmss>.png` into its directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;

use crate::error::{BridgeError, Result};

/// Default file name prefix for exported diagrams.
pub const DEFAULT_FILE_PREFIX: &str = "Markmap_";

/// Decodes renderer payloads and writes them as timestamped PNG files.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    directory: PathBuf,
    prefix: String,
}

impl ArtifactWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Decode `encoded` and write it to a new file, returning its absolute path.
    ///
    /// The bytes go to a uniquely named hidden temporary file first. The
    /// final name is then claimed without replacing anything, moving on to
    /// the next `_N` suffix when another export already holds it, so
    /// concurrent writers sharing a directory never clobber each other.
    pub fn persist(&self, encoded: &str) -> Result<PathBuf> {
        let bytes = decode_payload(encoded)?;

        let directory = std::path::absolute(&self.directory)
            .map_err(|e| BridgeError::storage(&self.directory, e))?;
        if !directory.is_dir() {
            fs::create_dir_all(&directory).map_err(|e| BridgeError::storage(&directory, e))?;
            log::debug!("Created artifact directory {directory:?}");
        }

        let mut temp = tempfile::Builder::new()
            .prefix(".markmap-")
            .suffix(".tmp")
            .tempfile_in(&directory)
            .map_err(|e| BridgeError::storage(&directory, e))?;
        temp.write_all(&bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| BridgeError::storage(temp.path(), e))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut attempt = 0u32;
        let path = loop {
            let path = candidate_path(&directory, &self.prefix, &timestamp, attempt);
            match temp.persist_noclobber(&path) {
                Ok(_) => break path,
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    temp = e.file;
                    attempt += 1;
                }
                // The temp file is removed when `e.file` drops.
                Err(e) => return Err(BridgeError::storage(&path, e.error)),
            }
        };

        log::info!("Saved diagram ({} bytes) to {path:?}", bytes.len());
        Ok(path)
    }
}

/// Persist `encoded` under `directory` with the default prefix.
pub fn persist(encoded: &str, directory: impl AsRef<Path>) -> Result<PathBuf> {
    ArtifactWriter::new(directory.as_ref()).persist(encoded)
}

/// Decode a base64 payload, with or without a `data:<mime>;base64,` prefix.
///
/// ASCII whitespace (line-wrapped base64) is ignored. Empty payloads are
/// rejected.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>> {
    let body = match encoded.trim_start().strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((header, data)) if header.ends_with(";base64") => data,
            _ => {
                return Err(BridgeError::InvalidEncoding(
                    "data URL is not base64 encoded".to_string(),
                ));
            }
        },
        None => encoded,
    };

    let compact: String = body
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(BridgeError::InvalidEncoding("empty payload".to_string()));
    }

    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| BridgeError::InvalidEncoding(e.to_string()))
}

/// `<prefix><timestamp>.png` for the first attempt, `<prefix><timestamp>_<n>.png`
/// after that.
fn candidate_path(directory: &Path, prefix: &str, timestamp: &str, attempt: u32) -> PathBuf {
    if attempt == 0 {
        directory.join(format!("{prefix}{timestamp}.png"))
    } else {
        directory.join(format!("{prefix}{timestamp}_{attempt}.png"))
    }
}
