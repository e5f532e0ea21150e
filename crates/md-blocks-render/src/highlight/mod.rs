//! Syntax highlighting of code blocks into semantic token runs.
//!
//! Colours are up to the renderer; this only says which parts of the code
//! are keywords, strings, comments and so on.

mod keyword;
mod syntax;

pub use keyword::{KeywordHighlighter, Language};
pub use syntax::SyntectHighlighter;

use serde::Serialize;

/// Semantic class of a run of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Plain,
    Keyword,
    TypeName,
    String,
    Number,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledRun {
    pub kind: TokenKind,
    pub text: String,
}

/// Text split into styled runs. Concatenating the runs gives back the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyledText {
    pub runs: Vec<StyledRun>,
}

impl StyledText {
    pub fn plain(text: &str) -> Self {
        let mut styled = Self::default();
        styled.push(TokenKind::Plain, text);
        styled
    }

    /// Append text, merging it into the last run when the kind matches.
    pub fn push(&mut self, kind: TokenKind, text: &str) {
        if text.is_empty() {
            return;
        }

        match self.runs.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.runs.push(StyledRun {
                kind,
                text: text.to_string(),
            }),
        }
    }

    pub fn to_plain_string(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Kind of the run covering byte `offset` of the plain text.
    pub fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        let mut end = 0;
        for run in &self.runs {
            end += run.text.len();
            if offset < end {
                return Some(run.kind);
            }
        }
        None
    }
}

/// Turns code into styled runs. Implementations must be cheap to share
/// between threads; the pipeline calls them from its highlight pool.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, language: &str) -> StyledText;
}
