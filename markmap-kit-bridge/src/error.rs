//! Error taxonomy shared by the render bridge and the artifact writer.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by [`RenderBridge`](crate::RenderBridge) completions and
/// [`ArtifactWriter`](crate::ArtifactWriter).
///
/// The type is `Clone` so one failure can reject every caller waiting on the
/// same pending submit.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The renderer's payload was not valid base64 image data.
    #[error("invalid artifact encoding: {0}")]
    InvalidEncoding(String),

    /// The artifact directory or file could not be created or written.
    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The renderer reported a failure while serializing its output.
    #[error("renderer export failed: {0}")]
    RenderExportFailed(String),

    /// An export was requested while a previous one was still pending.
    #[error("an export is already in progress")]
    ConcurrentExport,

    /// The bridge was closed before or while the operation was pending.
    #[error("render bridge is closed")]
    BridgeClosed,

    /// The renderer transport refused a command (process gone, host detached).
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),
}

/// Discriminant of [`BridgeError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidEncoding,
    StorageUnavailable,
    RenderExportFailed,
    ConcurrentExport,
    BridgeClosed,
    RendererUnavailable,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidEncoding(_) => ErrorKind::InvalidEncoding,
            BridgeError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            BridgeError::RenderExportFailed(_) => ErrorKind::RenderExportFailed,
            BridgeError::ConcurrentExport => ErrorKind::ConcurrentExport,
            BridgeError::BridgeClosed => ErrorKind::BridgeClosed,
            BridgeError::RendererUnavailable(_) => ErrorKind::RendererUnavailable,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::StorageUnavailable {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// True when the whole lifecycle has to restart with a fresh submit
    /// (the renderer or bridge is gone).
    pub fn requires_resubmit(&self) -> bool {
        matches!(
            self,
            BridgeError::BridgeClosed | BridgeError::RendererUnavailable(_)
        )
    }

    /// True when retrying only the export step is meaningful.
    pub fn is_export_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::RenderExportFailed(_)
                | BridgeError::InvalidEncoding(_)
                | BridgeError::ConcurrentExport
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
