use syntect::easy::ScopeRangeIterator;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::warn;

use super::{Highlighter, KeywordHighlighter, StyledText, TokenKind};

/// Scope prefixes and the token kind they stand for. Checked in order, so
/// more specific prefixes come first.
const SCOPE_KINDS: &[(&str, TokenKind)] = &[
    ("comment", TokenKind::Comment),
    ("string", TokenKind::String),
    ("constant.numeric", TokenKind::Number),
    ("constant.language", TokenKind::Keyword),
    ("keyword.operator", TokenKind::Plain),
    ("keyword", TokenKind::Keyword),
    ("storage", TokenKind::Keyword),
    ("entity.name.type", TokenKind::TypeName),
    ("entity.name.class", TokenKind::TypeName),
    ("entity.name.struct", TokenKind::TypeName),
    ("entity.name.enum", TokenKind::TypeName),
    ("support.type", TokenKind::TypeName),
    ("support.class", TokenKind::TypeName),
];

/// Highlights with syntect's grammars, mapping scopes to [`TokenKind`]s.
///
/// Languages without a bundled grammar go to the [`KeywordHighlighter`];
/// anything neither knows comes back as one plain run.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    scopes: Vec<(Scope, TokenKind)>,
    fallback: KeywordHighlighter,
}

impl SyntectHighlighter {
    /// Highlighter over syntect's bundled syntax definitions.
    pub fn new() -> Self {
        Self::with_syntaxes(SyntaxSet::load_defaults_newlines())
    }

    /// `syntaxes` must be built for lines that keep their newlines.
    pub fn with_syntaxes(syntaxes: SyntaxSet) -> Self {
        let scopes = SCOPE_KINDS
            .iter()
            .filter_map(|(name, kind)| Scope::new(name).ok().map(|scope| (scope, *kind)))
            .collect();

        Self {
            syntaxes,
            scopes,
            fallback: KeywordHighlighter::new(),
        }
    }

    pub fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        if language.is_empty() {
            return None;
        }

        let token = match language.to_ascii_lowercase().as_str() {
            "shell" | "zsh" | "console" | "shellscript" => "bash".to_string(),
            "c++" => "cpp".to_string(),
            "golang" => "go".to_string(),
            "python3" => "py".to_string(),
            "objc" | "objective-c" => "m".to_string(),
            other => other.to_string(),
        };

        self.syntaxes
            .find_syntax_by_token(&token)
            .or_else(|| self.syntaxes.find_syntax_by_extension(&token))
    }

    fn kind_of(&self, stack: &ScopeStack) -> TokenKind {
        for scope in stack.as_slice().iter().rev() {
            let matched = self
                .scopes
                .iter()
                .find(|(prefix, _)| prefix.is_prefix_of(*scope));
            if let Some((_, kind)) = matched {
                return *kind;
            }
        }

        TokenKind::Plain
    }

    fn highlight_with(&self, code: &str, syntax: &SyntaxReference) -> StyledText {
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut styled = StyledText::default();
        let mut done = 0;

        for line in LinesWithEndings::from(code) {
            let ops = match state.parse_line(line, &self.syntaxes) {
                Ok(ops) => ops,
                Err(err) => {
                    warn!("highlighting '{}' stopped: {err:?}", syntax.name);
                    break;
                }
            };

            for (range, op) in ScopeRangeIterator::new(&ops, line) {
                if let Err(err) = stack.apply(op) {
                    warn!("bad scope operation in '{}': {err:?}", syntax.name);
                }
                styled.push(self.kind_of(&stack), &line[range]);
            }
            done += line.len();
        }

        // whatever a parse error left behind stays readable
        styled.push(TokenKind::Plain, &code[done..]);
        styled
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    #[profiling::function]
    fn highlight(&self, code: &str, language: &str) -> StyledText {
        match self.find_syntax(language) {
            Some(syntax) => self.highlight_with(code, syntax),
            None => self.fallback.highlight(code, language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(styled: &StyledText, code: &str, needle: &str) -> Option<TokenKind> {
        let offset = code.find(needle).expect("needle in code");
        styled.kind_at(offset)
    }

    #[test]
    fn test_rust_scopes() {
        let highlighter = SyntectHighlighter::new();
        let code = "fn main() {\n    let x = 42;\n} // done";
        let styled = highlighter.highlight(code, "rust");

        assert_eq!(styled.to_plain_string(), code);
        assert_eq!(kind_of(&styled, code, "fn"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&styled, code, "let"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&styled, code, "42"), Some(TokenKind::Number));
        assert_eq!(kind_of(&styled, code, "// done"), Some(TokenKind::Comment));
    }

    #[test]
    fn test_python_scopes() {
        let highlighter = SyntectHighlighter::new();
        let code = "def f():\n    return \"x\"  # note\n";
        let styled = highlighter.highlight(code, "py");

        assert_eq!(styled.to_plain_string(), code);
        assert_eq!(kind_of(&styled, code, "def"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&styled, code, "return"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&styled, code, "\"x\""), Some(TokenKind::String));
        assert_eq!(kind_of(&styled, code, "# note"), Some(TokenKind::Comment));
    }

    #[test]
    fn test_shell_alias() {
        let highlighter = SyntectHighlighter::new();
        assert!(highlighter.find_syntax("shell").is_some());
        assert!(highlighter.find_syntax("sh").is_some());

        let code = "echo \"hi\"";
        let styled = highlighter.highlight(code, "zsh");
        assert_eq!(kind_of(&styled, code, "\"hi\""), Some(TokenKind::String));
    }

    #[test]
    fn test_missing_grammar_uses_keywords() {
        let highlighter = SyntectHighlighter::new();
        assert!(highlighter.find_syntax("swift").is_none());

        let code = "let s = \"hi\"";
        let styled = highlighter.highlight(code, "swift");
        assert_eq!(styled.runs[0].kind, TokenKind::Keyword);
        assert_eq!(styled.runs[0].text, "let");
    }

    #[test]
    fn test_unknown_language_is_plain() {
        let highlighter = SyntectHighlighter::new();
        let code = "+[-->++<]>.";

        for lang in ["", "brainfuck"] {
            let styled = highlighter.highlight(code, lang);
            assert_eq!(styled, StyledText::plain(code));
        }
    }
}
