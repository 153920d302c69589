//! Message and message-part types consumed and produced by the extractor.

use serde::{Deserialize, Serialize};

/// One piece of a chat message.
///
/// Serialized with a `type` discriminant so JSON consumers can dispatch on it:
/// `{"type":"text","content":"..."}` / `{"type":"diagram","spec":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    /// Free text.
    Text { content: String },
    /// A markmap specification lifted out of a fenced block.
    Diagram { spec: String },
}

impl MessagePart {
    pub fn text(content: impl Into<String>) -> Self {
        MessagePart::Text {
            content: content.into(),
        }
    }

    pub fn diagram(spec: impl Into<String>) -> Self {
        MessagePart::Diagram { spec: spec.into() }
    }

    pub fn is_diagram(&self) -> bool {
        matches!(self, MessagePart::Diagram { .. })
    }

    /// The diagram specification, if this is a diagram part.
    pub fn as_diagram(&self) -> Option<&str> {
        match self {
            MessagePart::Diagram { spec } => Some(spec),
            MessagePart::Text { .. } => None,
        }
    }
}

/// An ordered sequence of parts.
///
/// Messages are never edited in place by the extractor; [`Message::extracted`]
/// returns a replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn new(parts: Vec<MessagePart>) -> Self {
        Self { parts }
    }

    /// Convenience constructor for a message holding a single text part.
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(vec![MessagePart::text(content)])
    }

    /// Return a new message with markmap blocks split out of its text parts.
    pub fn extracted(&self) -> Message {
        Message::new(crate::extractor::extract(self.parts.iter().cloned()))
    }

    /// Iterate over the diagram specifications in this message, in order.
    pub fn diagrams(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(MessagePart::as_diagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_serialization_uses_type_tag() {
        let json = serde_json::to_string(&MessagePart::diagram("# root")).unwrap();
        assert_eq!(json, r##"{"type":"diagram","spec":"# root"}"##);

        let part: MessagePart =
            serde_json::from_str(r#"{"type":"text","content":"hello"}"#).unwrap();
        assert_eq!(part, MessagePart::text("hello"));
    }

    #[test]
    fn test_diagrams_iterator_skips_text() {
        let message = Message::new(vec![
            MessagePart::text("intro"),
            MessagePart::diagram("# one"),
            MessagePart::text("middle"),
            MessagePart::diagram("# two"),
        ]);
        let specs: Vec<&str> = message.diagrams().collect();
        assert_eq!(specs, vec!["# one", "# two"]);
    }

    #[test]
    fn test_extracted_leaves_original_untouched() {
        let message = Message::from_text("a\n```markmap\n# m\n```");
        let out = message.extracted();
        assert_eq!(message.parts.len(), 1);
        assert_eq!(
            out.parts,
            vec![MessagePart::text("a"), MessagePart::diagram("# m")]
        );
    }
}
