//! Boundary detection over growing snapshots of a streamed message.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::element::{RawBlock, Span};
use crate::error::StreamInconsistency;
use crate::line::{classify_line, FenceMarker, LineKind};
use crate::partial::{OpenFence, ParseCursor};

/// What to do with a snapshot that does not extend the text seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InconsistencyPolicy {
    /// Fail with [`StreamInconsistency`] and leave the cursor untouched.
    #[default]
    Reject,

    /// Roll back to the last block boundary inside the longest common prefix
    /// and continue from there. Blocks ending past that boundary are emitted
    /// again, so callers holding earlier output should drop them (see
    /// [`BoundaryDetector::last_rewind`]).
    Resync,
}

/// Converts full-text snapshots of one turn into completed [`RawBlock`]s.
///
/// Each call to [`consume`](Self::consume) takes the whole text received so
/// far, not just the newest chunk. The detector works out the delta itself
/// and only returns blocks that completed since the previous call.
pub struct BoundaryDetector {
    /// All text of the turn seen so far
    buffer: String,

    /// End of the text resolved into emitted blocks
    consumed: usize,

    /// Start of the first line not scanned yet
    line_start: usize,

    /// Is there paragraph text between `consumed` and `line_start`?
    paragraph: bool,

    /// Code fence waiting for its closing line
    fence: Option<OpenFence>,

    /// Span ends of the blocks emitted this turn
    boundaries: Vec<usize>,

    /// Where the last `consume` rolled the cursor back to, if it did
    rewound_to: Option<usize>,

    policy: InconsistencyPolicy,
}

/// What a complete line does to the pending text.
enum Step {
    /// Opaque content inside an open fence
    Inside,
    CloseFence,
    OpenFence {
        marker: FenceMarker,
        language: String,
    },
    Standalone,
    Blank,
    Text,
}

impl BoundaryDetector {
    pub fn new() -> Self {
        Self::with_policy(InconsistencyPolicy::default())
    }

    pub fn with_policy(policy: InconsistencyPolicy) -> Self {
        Self {
            buffer: String::new(),
            consumed: 0,
            line_start: 0,
            paragraph: false,
            fence: None,
            boundaries: Vec::new(),
            rewound_to: None,
            policy,
        }
    }

    /// Forget the current turn. Must be called before reusing the detector
    /// for a new message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.consumed = 0;
        self.line_start = 0;
        self.paragraph = false;
        self.fence = None;
        self.boundaries.clear();
        self.rewound_to = None;
    }

    pub fn policy(&self) -> InconsistencyPolicy {
        self.policy
    }

    /// Bytes of the snapshot already emitted as blocks.
    pub fn consumed_len(&self) -> usize {
        self.consumed
    }

    /// Text after the last emitted block.
    pub fn pending_tail(&self) -> &str {
        &self.buffer[self.consumed..]
    }

    /// Check if we're currently inside a code block.
    pub fn in_code_block(&self) -> bool {
        self.fence.is_some()
    }

    /// Cursor position the last [`consume`](Self::consume) rewound to when it
    /// resynchronised. Blocks emitted earlier that end past it are no longer
    /// part of the text.
    pub fn last_rewind(&self) -> Option<usize> {
        self.rewound_to
    }

    pub fn cursor(&self) -> ParseCursor<'_> {
        ParseCursor {
            consumed_len: self.consumed,
            pending_tail: self.pending_tail(),
            fence: self.fence.as_ref(),
        }
    }

    /// Consume the latest full text of the turn and return the blocks that
    /// completed since the last call.
    ///
    /// When `is_done` is set, whatever is still pending (an unclosed code
    /// fence included) is flushed as one final block.
    #[profiling::function]
    pub fn consume(
        &mut self,
        snapshot: &str,
        is_done: bool,
    ) -> Result<Vec<RawBlock>, StreamInconsistency> {
        self.rewound_to = None;
        self.sync(snapshot)?;

        let mut blocks = Vec::new();
        self.scan(&mut blocks);
        if is_done {
            self.flush(&mut blocks);
        }

        if !blocks.is_empty() {
            trace!(
                "emitted {} blocks, consumed {}/{}",
                blocks.len(),
                self.consumed,
                self.buffer.len()
            );
        }

        Ok(blocks)
    }

    /// Append the new part of `snapshot` to the buffer.
    fn sync(&mut self, snapshot: &str) -> Result<(), StreamInconsistency> {
        if let Some(delta) = snapshot.strip_prefix(self.buffer.as_str()) {
            self.buffer.push_str(delta);
            return Ok(());
        }

        let diverges_at = common_prefix_len(&self.buffer, snapshot);
        match self.policy {
            InconsistencyPolicy::Reject => Err(StreamInconsistency {
                diverges_at,
                seen_len: self.buffer.len(),
            }),
            InconsistencyPolicy::Resync => {
                warn!(
                    "snapshot diverged at byte {diverges_at} of {}, resyncing",
                    self.buffer.len()
                );
                self.rewind(diverges_at);
                self.buffer.push_str(&snapshot[diverges_at..]);
                Ok(())
            }
        }
    }

    /// Drop everything after `at`. Scanning restarts at the last block
    /// boundary at or before it, where no fence or paragraph is open.
    fn rewind(&mut self, at: usize) {
        self.buffer.truncate(at);

        let kept = self.boundaries.partition_point(|&end| end <= at);
        self.boundaries.truncate(kept);
        self.consumed = self.boundaries.last().copied().unwrap_or(0);
        self.rewound_to = Some(self.consumed);

        self.line_start = self.consumed;
        self.paragraph = false;
        self.fence = None;
    }

    /// Resolve every complete line after `line_start`.
    fn scan(&mut self, blocks: &mut Vec<RawBlock>) {
        while let Some(nl) = self.buffer[self.line_start..].find('\n') {
            let line_end = self.line_start + nl;
            let next = line_end + 1;

            let step = {
                let line = &self.buffer[self.line_start..line_end];
                match &self.fence {
                    Some(fence) if fence.marker.closes(line) => Step::CloseFence,
                    Some(_) => Step::Inside,
                    None => match classify_line(line) {
                        LineKind::Blank => Step::Blank,
                        LineKind::Text => Step::Text,
                        LineKind::Fence { marker, language } => Step::OpenFence {
                            marker,
                            language: language.to_string(),
                        },
                        kind => {
                            debug_assert!(kind.is_standalone());
                            Step::Standalone
                        }
                    },
                }
            };

            match step {
                Step::Inside => {}
                Step::Text => self.paragraph = true,
                Step::Blank => self.flush_paragraph(blocks, next),
                Step::OpenFence { marker, language } => {
                    self.flush_paragraph(blocks, self.line_start);
                    self.fence = Some(OpenFence {
                        marker,
                        language,
                        start: self.line_start,
                    });
                }
                Step::CloseFence => {
                    if let Some(fence) = self.fence.take() {
                        self.emit(blocks, fence.start, line_end, next);
                    }
                }
                Step::Standalone => {
                    self.flush_paragraph(blocks, self.line_start);
                    self.emit(blocks, self.line_start, line_end, next);
                }
            }

            self.line_start = next;
        }
    }

    /// Emit the pending paragraph, if any, as a block ending at `end`.
    fn flush_paragraph(&mut self, blocks: &mut Vec<RawBlock>, end: usize) {
        if !self.paragraph {
            return;
        }

        self.paragraph = false;
        self.emit(blocks, self.consumed, self.line_start, end);
    }

    /// Emit `buffer[text_start..text_end]` as a block whose span runs from
    /// the current cursor to `end`.
    fn emit(&mut self, blocks: &mut Vec<RawBlock>, text_start: usize, text_end: usize, end: usize) {
        let text = block_text(&self.buffer[text_start..text_end]);
        blocks.push(RawBlock {
            text: text.to_string(),
            span: Span::new(self.consumed, end),
        });
        self.consumed = end;
        self.boundaries.push(end);
    }

    /// End of stream: everything pending becomes one last block.
    fn flush(&mut self, blocks: &mut Vec<RawBlock>) {
        let end = self.buffer.len();
        if self.consumed < end {
            let text_start = match self.fence.take() {
                Some(fence) => fence.start,
                None => self.consumed,
            };
            self.emit(blocks, text_start, end, end);
        }

        self.line_start = end;
        self.paragraph = false;
        self.fence = None;
    }
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop leading blank lines and trailing line breaks from a block region.
fn block_text(region: &str) -> &str {
    let mut start = 0;
    for line in region.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }

    region[start..].trim_end_matches(['\n', '\r'])
}

/// Byte length of the longest common prefix, on a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_text_strips_blank_lines() {
        assert_eq!(block_text("\n  \nhello\nworld\n"), "hello\nworld");
        assert_eq!(block_text("\r\n"), "");
        assert_eq!(block_text("    indented\n"), "    indented");
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("hello", "help"), 3);
        assert_eq!(common_prefix_len("abc", "abcdef"), 3);
        assert_eq!(common_prefix_len("abcdef", "abc"), 3);
        assert_eq!(common_prefix_len("", "abc"), 0);
        // diverging inside a multibyte char lands on its boundary
        assert_eq!(common_prefix_len("aé", "aè"), 1);
    }
}
