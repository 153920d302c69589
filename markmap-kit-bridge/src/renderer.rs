//! Renderer capability and the message types exchanged with it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An external surface that can render a markmap specification and serialize
/// the result.
///
/// Both methods are fire-and-forget: returning `Ok` only means the
/// instruction was handed over. Outcomes come back later as
/// [`RendererSignal`]s delivered to a [`BridgeHandle`](crate::BridgeHandle),
/// possibly on another thread and possibly before the method returns.
pub trait Renderer: Send + Sync {
    /// Load `spec` and lay it out. Answered by [`RendererSignal::Rendered`].
    fn load(&self, spec: &str) -> Result<()>;

    /// Serialize the current rendering. Answered by
    /// [`RendererSignal::Exported`] or [`RendererSignal::ExportFailed`].
    fn export(&self) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn load(&self, spec: &str) -> Result<()> {
        (**self).load(spec)
    }

    fn export(&self) -> Result<()> {
        (**self).export()
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn load(&self, spec: &str) -> Result<()> {
        (**self).load(spec)
    }

    fn export(&self) -> Result<()> {
        (**self).export()
    }
}

/// A signal emitted by the renderer.
///
/// JSON form: `{"type":"rendered"}`, `{"type":"exported","data":"..."}`,
/// `{"type":"export_failed","message":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererSignal {
    /// The loaded specification has been laid out.
    Rendered,
    /// Export finished; `data` is the encoded image (usually a PNG data URL).
    Exported { data: String },
    /// Export failed inside the renderer.
    ExportFailed { message: String },
}

impl RendererSignal {
    /// Decode a signal posted by a script host or renderer process.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// An instruction sent to a renderer over a message transport.
///
/// JSON form: `{"type":"load","spec":"..."}`, `{"type":"export"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererCommand {
    Load { spec: String },
    Export,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_json_forms() {
        assert_eq!(
            RendererSignal::from_json(r#"{"type":"rendered"}"#).unwrap(),
            RendererSignal::Rendered
        );
        assert_eq!(
            RendererSignal::from_json(r#"{"type":"exported","data":"data:image/png;base64,AAAA"}"#)
                .unwrap(),
            RendererSignal::Exported {
                data: "data:image/png;base64,AAAA".to_string()
            }
        );
        assert_eq!(
            RendererSignal::from_json(r#"{"type":"export_failed","message":"boom"}"#).unwrap(),
            RendererSignal::ExportFailed {
                message: "boom".to_string()
            }
        );
        assert!(RendererSignal::from_json(r#"{"type":"exploded"}"#).is_err());
    }

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_string(&RendererCommand::Load {
            spec: "# root\n- `a`".to_string(),
        })
        .unwrap();
        assert_eq!(json, r##"{"type":"load","spec":"# root\n- `a`"}"##);
        assert_eq!(
            serde_json::to_string(&RendererCommand::Export).unwrap(),
            r#"{"type":"export"}"#
        );
    }
}
