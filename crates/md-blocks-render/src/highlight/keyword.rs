use hashbrown::{HashMap, HashSet};

use super::{Highlighter, StyledText, TokenKind};

/// Languages common in chat replies that the bundled syntax set lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Swift,
    TypeScript,
    Kotlin,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Swift, Language::TypeScript, Language::Kotlin];

    /// Resolve a fence language token, aliases included.
    pub fn from_token(token: &str) -> Option<Self> {
        let lang = match token.to_ascii_lowercase().as_str() {
            "swift" => Language::Swift,
            "typescript" | "ts" | "tsx" | "mts" => Language::TypeScript,
            "kotlin" | "kt" | "kts" => Language::Kotlin,
            _ => return None,
        };

        Some(lang)
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Language::Swift => &[
                "as", "async", "await", "break", "case", "class", "continue", "default",
                "defer", "do", "else", "enum", "extension", "false", "for", "func", "guard",
                "if", "import", "in", "init", "let", "nil", "private", "protocol", "public",
                "return", "self", "static", "struct", "switch", "throw", "throws", "true",
                "try", "var", "while",
            ],
            Language::TypeScript => &[
                "as", "async", "await", "break", "case", "catch", "class", "const",
                "continue", "declare", "default", "else", "enum", "export", "extends",
                "false", "finally", "for", "from", "function", "if", "implements", "import",
                "in", "instanceof", "interface", "let", "namespace", "new", "null",
                "private", "public", "readonly", "return", "switch", "this", "throw", "true",
                "try", "type", "typeof", "undefined", "var", "void", "while", "yield",
            ],
            Language::Kotlin => &[
                "as", "break", "class", "continue", "data", "else", "false", "for", "fun",
                "if", "import", "in", "interface", "is", "null", "object", "override",
                "package", "private", "return", "sealed", "super", "this", "throw", "true",
                "try", "val", "var", "when", "while",
            ],
        }
    }

    fn quotes(&self) -> &'static [char] {
        match self {
            Language::TypeScript => &['"', '\'', '`'],
            Language::Swift | Language::Kotlin => &['"'],
        }
    }
}

/// Small lexical highlighter for C-like syntax: keywords, capitalised type
/// names, strings, numbers and comments. Unknown languages come back as one
/// plain run.
pub struct KeywordHighlighter {
    keywords: HashMap<Language, HashSet<&'static str>>,
}

impl KeywordHighlighter {
    pub fn new() -> Self {
        let keywords = Language::ALL
            .iter()
            .map(|lang| (*lang, lang.keywords().iter().copied().collect()))
            .collect();

        Self { keywords }
    }
}

impl Default for KeywordHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for KeywordHighlighter {
    #[profiling::function]
    fn highlight(&self, code: &str, language: &str) -> StyledText {
        let Some(lang) = Language::from_token(language) else {
            return StyledText::plain(code);
        };
        let Some(keywords) = self.keywords.get(&lang) else {
            return StyledText::plain(code);
        };

        let mut styled = StyledText::default();
        let mut pos = 0;
        while let Some(c) = code[pos..].chars().next() {
            let rest = &code[pos..];
            let (kind, len) = next_token(rest, c, lang, keywords);
            styled.push(kind, &rest[..len]);
            pos += len;
        }

        styled
    }
}

/// Kind and byte length of the token at the start of `rest`. Always
/// returns a non-zero length.
fn next_token(
    rest: &str,
    c: char,
    lang: Language,
    keywords: &HashSet<&'static str>,
) -> (TokenKind, usize) {
    if rest.starts_with("//") {
        return (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()));
    }

    if rest.starts_with("/*") {
        let len = rest[2..].find("*/").map_or(rest.len(), |end| end + 4);
        return (TokenKind::Comment, len);
    }

    if lang.quotes().contains(&c) {
        return (TokenKind::String, string_len(rest, c));
    }

    if c.is_ascii_digit() {
        let len = rest
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
            .unwrap_or(rest.len());
        return (TokenKind::Number, len);
    }

    if c.is_alphabetic() || c == '_' {
        let len = rest
            .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..len];
        let kind = if keywords.contains(word) {
            TokenKind::Keyword
        } else if word.starts_with(char::is_uppercase) {
            TokenKind::TypeName
        } else {
            TokenKind::Plain
        };
        return (kind, len);
    }

    (TokenKind::Plain, c.len_utf8())
}

/// Length of a string literal starting at `rest`, closing quote included.
/// Unterminated strings end at the line break (or the end of the code).
fn string_len(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' => escaped = true,
            '\n' if quote != '`' => return i,
            c if c == quote => return i + c.len_utf8(),
            _ => {}
        }
    }

    rest.len()
}
