//! Rendering pipeline for streamed chat messages.
//!
//! [`ResponseParser`] runs the block parser from `md-blocks` on a worker
//! thread, throttled by a [`ReparsePolicy`], and hands back
//! [`RenderResult`]s. Code blocks are highlighted on a small thread pool
//! through a shared [`HighlightCache`] and show up plain until that is
//! done.

mod cache;
mod config;
mod error;
mod highlight;
mod policy;
mod pool;
mod result;
mod scheduler;

pub use cache::HighlightCache;
pub use config::PipelineConfig;
pub use error::Error;
pub use highlight::{
    Highlighter, KeywordHighlighter, Language, StyledRun, StyledText, SyntectHighlighter, TokenKind,
};
pub use policy::{should_reparse, ReparsePolicy};
pub use result::RenderResult;
pub use scheduler::{Completion, Outcome, ResponseParser};

pub type Result<T> = std::result::Result<T, Error>;
