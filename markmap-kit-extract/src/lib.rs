//! markmap-kit-extract: fenced markmap block extraction for chat messages.
//!
//! Chat models answer with free text that may embed mind-map specifications
//! inside fenced blocks:
//!
//! ````text
//! Here is the outline:
//! ```markmap
//! # Project
//! - Design
//! - Build
//! ```
//! Let me know if you want more detail.
//! ````
//!
//! [`extract`] splits the text parts of a message around those fences and
//! emits each block body as a separate [`MessagePart::Diagram`], keeping the
//! surrounding prose as [`MessagePart::Text`] in its original order.
//!
//! # Modules
//!
//! - [`types`] - [`Message`] and [`MessagePart`]
//! - [`extractor`] - the line-oriented block extractor
//!
//! # Example
//!
//! ```
//! use markmap_kit_extract::{MessagePart, extract};
//!
//! let parts = extract(vec![MessagePart::text(
//!     "before\n```markmap\n# root\n- a\n```\nafter",
//! )]);
//! assert_eq!(
//!     parts,
//!     vec![
//!         MessagePart::text("before"),
//!         MessagePart::diagram("# root\n- a"),
//!         MessagePart::text("after"),
//!     ]
//! );
//! ```

pub mod extractor;
pub mod types;

pub use extractor::{
    MARKMAP_END_MARKER, MARKMAP_START_MARKER, contains_markers, extract, extract_messages,
};
pub use types::{Message, MessagePart};
