//! State tracking for text that has not resolved into a block yet.

use crate::line::FenceMarker;

/// A fenced code block waiting for its closing marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFence {
    pub marker: FenceMarker,

    /// Language token after the opening marker, empty if none
    pub language: String,

    /// Byte offset of the opening fence line
    pub start: usize,
}

/// Read-only view of a detector's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCursor<'a> {
    /// Bytes of the snapshot already emitted as blocks
    pub consumed_len: usize,

    /// Text after the last emitted block
    pub pending_tail: &'a str,

    pub fence: Option<&'a OpenFence>,
}
