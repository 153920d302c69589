//! markmap-kit-bridge: async bridge to an external markmap renderer.
//!
//! A markmap renderer (a web view, a headless browser, a helper process)
//! lives in its own execution context. It can only be told to do things, and
//! it answers later through callbacks that may arrive on any thread. This
//! crate puts a future-based API in front of that.
//!
//! # Architecture
//!
//! - [`bridge`] - [`RenderBridge`] and its callback-side [`BridgeHandle`]
//! - [`completion`] - [`Completion`], the single-shot future both operations return
//! - [`renderer`] - the [`Renderer`] capability and the signal/command message types
//! - [`script`] - [`ScriptRenderer`] for script-capable views, plus the renderer page
//! - [`process`] - [`ProcessRenderer`], a line-delimited JSON renderer subprocess
//! - [`artifact`] - [`ArtifactWriter`], decoding exports into timestamped PNG files
//! - [`error`] - [`BridgeError`] and [`ErrorKind`]
//!
//! # Example
//!
//! ```ignore
//! use markmap_kit_bridge::{ArtifactWriter, ProcessRenderer, RenderBridge};
//!
//! let mut renderer = ProcessRenderer::spawn("markmap-renderer", &[])?;
//! let signals = renderer.take_signals().unwrap();
//! let mut bridge = RenderBridge::new(renderer);
//! bridge.attach_signals(signals);
//!
//! bridge.submit_content("# Project\n- Design\n- Build").await?;
//! let path = bridge
//!     .export_to_file(&ArtifactWriter::new("/tmp/markmaps"))
//!     .await?;
//! ```

pub mod artifact;
pub mod bridge;
pub mod completion;
pub mod error;
pub mod process;
pub mod renderer;
pub mod script;

pub use artifact::{ArtifactWriter, DEFAULT_FILE_PREFIX, decode_payload, persist};
pub use bridge::{BridgeHandle, RenderBridge};
pub use completion::Completion;
pub use error::{BridgeError, ErrorKind, Result};
pub use process::ProcessRenderer;
pub use renderer::{Renderer, RendererCommand, RendererSignal};
pub use script::{
    MARKMAP_PAGE_BASE_URL, MARKMAP_PAGE_HTML, ScriptHost, ScriptRenderer, markmap_page,
};
