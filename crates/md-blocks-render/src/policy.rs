/// Decides whether a grown snapshot is worth another parse pass.
///
/// While tokens stream in, parsing on every delta wastes work. The policy
/// lets a pass run only once the text has grown by `threshold` characters;
/// in between the renderer keeps showing the last results it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReparsePolicy {
    threshold: usize,
}

impl ReparsePolicy {
    /// A zero threshold reparses on every call.
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Sets a new threshold and returns self for method chaining
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_reparse(&self, new_len: usize, last_parsed_len: usize, is_done: bool) -> bool {
        should_reparse(new_len, last_parsed_len, self.threshold, is_done)
    }
}

/// True when the stream is done, the threshold is zero, or the snapshot
/// grew by at least `threshold` characters since the last parse.
pub fn should_reparse(
    new_len: usize,
    last_parsed_len: usize,
    threshold: usize,
    is_done: bool,
) -> bool {
    is_done || threshold == 0 || new_len.saturating_sub(last_parsed_len) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_gating() {
        assert!(!should_reparse(105, 100, 10, false));
        assert!(should_reparse(110, 100, 10, false));
        assert!(should_reparse(111, 100, 10, false));
    }

    #[test]
    fn test_zero_threshold_always_reparses() {
        assert!(should_reparse(100, 100, 0, false));
        assert!(should_reparse(0, 50, 0, false));
    }

    #[test]
    fn test_done_always_reparses() {
        assert!(should_reparse(101, 100, 1000, true));
        assert!(should_reparse(100, 100, usize::MAX, true));
    }

    #[test]
    fn test_shrinking_snapshot_does_not_underflow() {
        assert!(!should_reparse(10, 100, 5, false));
    }

    #[test]
    fn test_policy_value() {
        let policy = ReparsePolicy::new(10).with_threshold(20);
        assert_eq!(policy.threshold(), 20);
        assert!(!policy.should_reparse(115, 100, false));
        assert!(policy.should_reparse(120, 100, false));
        assert!(ReparsePolicy::default().should_reparse(1, 1, false));
    }
}
