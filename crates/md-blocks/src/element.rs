//! Blocks and nodes - the stable output of parsing.

use serde::Serialize;

use crate::classify::classify;

/// A byte range into a turn's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn resolve<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.start..self.end]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// A boundary-confirmed block of a streamed message, not yet classified.
///
/// `span` covers everything the block consumed from the snapshot, including
/// blank lines before it and the line break that terminated it. `text` is
/// just the block itself. Spans of consecutive blocks of one turn are
/// contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub text: String,
    pub span: Span,
}

impl RawBlock {
    /// Whitespace left over at the end of a stream.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn classify(&self) -> Vec<StructuralNode> {
        classify(&self.text)
    }
}

/// Typed classification of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralNode {
    /// Plain text, lines joined with `\n`
    Paragraph { text: String },

    /// Heading with level (1-6)
    Heading { level: u8, text: String },

    /// Fenced code block; `language` is empty when the fence had none
    CodeBlock { language: String, code: String },

    /// List item with its marker stripped. `number` is set for ordered items.
    ListItem { text: String, number: Option<u32> },

    /// Blockquote with the `>` markers stripped
    Quote { text: String },

    /// Thematic break (---, ***, ___)
    HorizontalRule,
}

impl StructuralNode {
    pub fn is_code_block(&self) -> bool {
        matches!(self, StructuralNode::CodeBlock { .. })
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            StructuralNode::CodeBlock { language, .. } => Some(language),
            _ => None,
        }
    }

    /// The node's textual payload. Code for code blocks, empty for rules.
    pub fn text(&self) -> &str {
        match self {
            StructuralNode::Paragraph { text }
            | StructuralNode::Heading { text, .. }
            | StructuralNode::ListItem { text, .. }
            | StructuralNode::Quote { text } => text,
            StructuralNode::CodeBlock { code, .. } => code,
            StructuralNode::HorizontalRule => "",
        }
    }
}
