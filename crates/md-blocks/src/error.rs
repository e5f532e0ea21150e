/// A snapshot that does not extend the text already seen for the turn.
///
/// Usually means the caller forgot to reset the detector when starting a new
/// turn, or delivered snapshots out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("snapshot diverges from previously seen text at byte {diverges_at} (seen {seen_len} bytes)")]
pub struct StreamInconsistency {
    /// Length of the longest common prefix of the old and new text
    pub diverges_at: usize,

    /// How much text the detector had seen before the bad snapshot
    pub seen_len: usize,
}
