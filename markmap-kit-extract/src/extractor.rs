//! Line-oriented extraction of fenced markmap blocks.
//!
//! The extractor walks the lines of every text part of a message with a
//! two-state machine (`Outside` / `InsideBlock`). Fence lines are consumed,
//! block bodies become [`MessagePart::Diagram`] parts and the prose around
//! them stays as [`MessagePart::Text`]. Parsing never fails: an unterminated
//! block at the end of a message is emitted as a diagram anyway.

use crate::types::{Message, MessagePart};

/// Opening fence of a markmap block (compared against the trimmed line).
pub const MARKMAP_START_MARKER: &str = "```markmap";

/// Closing fence of a markmap block (compared against the trimmed line).
pub const MARKMAP_END_MARKER: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Outside,
    InsideBlock,
}

/// Per-message parse state. Lives for exactly one call to [`extract`].
struct ParseState {
    block: BlockState,
    /// Current run of plain text lines.
    text: String,
    /// Body of the block being collected.
    diagram: String,
    out: Vec<MessagePart>,
}

impl ParseState {
    fn new() -> Self {
        Self {
            block: BlockState::Outside,
            text: String::new(),
            diagram: String::new(),
            out: Vec::new(),
        }
    }

    fn feed_text(&mut self, content: &str) {
        for line in content.lines() {
            self.feed_line(line);
        }
        // Text runs never merge across part boundaries.
        self.flush_text();
    }

    fn feed_line(&mut self, line: &str) {
        let trimmed = line.trim();
        match self.block {
            BlockState::Outside if trimmed == MARKMAP_START_MARKER => {
                self.flush_text();
                self.block = BlockState::InsideBlock;
            }
            BlockState::Outside => {
                self.text.push_str(line);
                self.text.push('\n');
            }
            BlockState::InsideBlock if trimmed == MARKMAP_END_MARKER => {
                self.flush_diagram();
                self.block = BlockState::Outside;
            }
            BlockState::InsideBlock => {
                self.diagram.push_str(line);
                self.diagram.push('\n');
            }
        }
    }

    fn flush_text(&mut self) {
        let text = self.text.trim();
        if !text.is_empty() {
            self.out.push(MessagePart::text(text));
        }
        self.text.clear();
    }

    fn flush_diagram(&mut self) {
        let spec = self.diagram.trim();
        if spec.is_empty() {
            log::trace!("Skipping empty markmap block");
        } else {
            self.out.push(MessagePart::diagram(spec));
        }
        self.diagram.clear();
    }

    fn push_part(&mut self, part: MessagePart) {
        self.flush_text();
        self.out.push(part);
    }

    fn finish(mut self) -> Vec<MessagePart> {
        self.flush_text();
        if self.block == BlockState::InsideBlock {
            log::debug!(
                "Message ended inside an unterminated markmap block ({} bytes collected)",
                self.diagram.len()
            );
            self.flush_diagram();
        }
        self.out
    }
}

/// Split the text parts of one message around fenced markmap blocks.
///
/// Block state carries over between consecutive text parts, so a block may
/// open in one part and close in a later one. Diagram parts already present in
/// the input are passed through at their original position.
pub fn extract<I>(parts: I) -> Vec<MessagePart>
where
    I: IntoIterator<Item = MessagePart>,
{
    let mut state = ParseState::new();
    for part in parts {
        match part {
            MessagePart::Text { content } => state.feed_text(&content),
            other => state.push_part(other),
        }
    }
    state.finish()
}

/// Apply [`extract`] to every message, each with a fresh parse state.
pub fn extract_messages(messages: &[Message]) -> Vec<Message> {
    messages.iter().map(Message::extracted).collect()
}

/// Quick check for whether `text` contains a markmap start fence line.
pub fn contains_markers(text: &str) -> bool {
    text.lines().any(|line| line.trim() == MARKMAP_START_MARKER)
}
