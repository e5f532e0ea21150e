//! Line markers shared by the boundary detector and the classifier.

/// Headings deeper than this are plain text.
pub const MAX_HEADING_LEVEL: usize = 6;

/// Longest digit run accepted as an ordered list number.
const MAX_ORDINAL_DIGITS: usize = 9;

/// The fence that opened a code block: ``` or ~~~, possibly longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceMarker {
    pub fence_char: char,
    pub fence_len: usize,
}

impl FenceMarker {
    /// Parse an opening fence line. Returns the marker and the info string
    /// trailing it.
    pub fn open(line: &str) -> Option<(Self, &str)> {
        let trimmed = line.trim_start();
        let fence_char = trimmed.chars().next()?;
        if fence_char != '`' && fence_char != '~' {
            return None;
        }

        let fence_len = trimmed.chars().take_while(|&c| c == fence_char).count();
        if fence_len < 3 {
            return None;
        }

        Some((
            Self {
                fence_char,
                fence_len,
            },
            trimmed[fence_len..].trim(),
        ))
    }

    /// Does `line` close a fence opened with this marker?
    pub fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|&c| c == self.fence_char).count();
        run >= self.fence_len && run == trimmed.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Fence {
        marker: FenceMarker,
        language: &'a str,
    },
    Heading {
        level: u8,
        text: &'a str,
    },
    Rule,
    ListItem {
        number: Option<u32>,
        text: &'a str,
    },
    Quote {
        text: &'a str,
    },
    Text,
}

impl LineKind<'_> {
    /// Lines that form a block on their own.
    pub fn is_standalone(&self) -> bool {
        matches!(
            self,
            LineKind::Heading { .. }
                | LineKind::Rule
                | LineKind::ListItem { .. }
                | LineKind::Quote { .. }
        )
    }
}

/// Classify a single line (without its line break).
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim_end_matches('\r');
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return LineKind::Blank;
    }

    if let Some((marker, info)) = FenceMarker::open(trimmed) {
        let language = info.split_whitespace().next().unwrap_or("");
        return LineKind::Fence { marker, language };
    }

    if let Some(heading) = heading(trimmed) {
        return heading;
    }

    // before list items, `***` is a rule and not a bullet
    if is_rule(trimmed) {
        return LineKind::Rule;
    }

    if let Some(item) = list_item(trimmed) {
        return item;
    }

    if let Some(text) = trimmed.strip_prefix('>') {
        return LineKind::Quote {
            text: text.trim_start(),
        };
    }

    LineKind::Text
}

fn heading(trimmed: &str) -> Option<LineKind<'_>> {
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some(LineKind::Heading {
        level: level as u8,
        text: rest.trim(),
    })
}

fn is_rule(trimmed: &str) -> bool {
    let trimmed = trimmed.trim_end();
    let mut chars = trimmed.chars();
    let Some(rule_char) = chars.next() else {
        return false;
    };

    matches!(rule_char, '-' | '*' | '_') && trimmed.len() >= 3 && chars.all(|c| c == rule_char)
}

fn list_item(trimmed: &str) -> Option<LineKind<'_>> {
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        return after_marker(rest).map(|text| LineKind::ListItem { number: None, text });
    }

    let digits = trimmed.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > MAX_ORDINAL_DIGITS {
        return None;
    }

    let rest = &trimmed[digits..];
    let rest = rest.strip_prefix(['.', ')'])?;
    let number = trimmed[..digits].parse().ok()?;
    after_marker(rest).map(|text| LineKind::ListItem {
        number: Some(number),
        text,
    })
}

/// A list marker only counts when whitespace follows it.
fn after_marker(rest: &str) -> Option<&str> {
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_open_and_close() {
        let (marker, info) = FenceMarker::open("```rust ignore").unwrap();
        assert_eq!(marker.fence_char, '`');
        assert_eq!(marker.fence_len, 3);
        assert_eq!(info, "rust ignore");

        assert!(marker.closes("```"));
        assert!(marker.closes("  ````  "));
        assert!(!marker.closes("~~~"));
        assert!(!marker.closes("``"));
        assert!(!marker.closes("```rust"));
    }

    #[test]
    fn test_longer_fence_needs_longer_close() {
        let (marker, _) = FenceMarker::open("~~~~").unwrap();
        assert!(!marker.closes("~~~"));
        assert!(marker.closes("~~~~"));
    }

    #[test]
    fn test_heading_needs_whitespace() {
        assert_eq!(
            classify_line("## Title"),
            LineKind::Heading {
                level: 2,
                text: "Title"
            }
        );
        assert_eq!(classify_line("##Title"), LineKind::Text);
        assert_eq!(classify_line("####### Title"), LineKind::Text);
    }

    #[test]
    fn test_rules() {
        assert_eq!(classify_line("---"), LineKind::Rule);
        assert_eq!(classify_line("*****"), LineKind::Rule);
        assert_eq!(classify_line("___ "), LineKind::Rule);
        assert_eq!(classify_line("--"), LineKind::Text);
        assert_eq!(classify_line("-*-"), LineKind::Text);
    }

    #[test]
    fn test_list_markers() {
        assert_eq!(
            classify_line("- item"),
            LineKind::ListItem {
                number: None,
                text: "item"
            }
        );
        assert_eq!(
            classify_line("  12) twelfth"),
            LineKind::ListItem {
                number: Some(12),
                text: "twelfth"
            }
        );
        assert_eq!(classify_line("-item"), LineKind::Text);
        assert_eq!(classify_line("**bold** start"), LineKind::Text);
        assert_eq!(classify_line("3.14 is pi"), LineKind::Text);
    }

    #[test]
    fn test_quote_and_blank() {
        assert_eq!(classify_line("> quoted"), LineKind::Quote { text: "quoted" });
        assert_eq!(classify_line(">"), LineKind::Quote { text: "" });
        assert_eq!(classify_line("   \r"), LineKind::Blank);
    }
}
