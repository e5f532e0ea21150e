//! Incremental block parser for streaming LLM output.
//!
//! Designed for chat interfaces where markdown arrives token-by-token.
//! [`BoundaryDetector`] turns growing snapshots of a message into completed
//! [`RawBlock`]s, and [`classify`] turns each block into [`StructuralNode`]s.

mod classify;
mod detector;
mod element;
mod error;
mod line;
mod partial;

pub use classify::classify;
pub use detector::{BoundaryDetector, InconsistencyPolicy};
pub use element::{RawBlock, Span, StructuralNode};
pub use error::StreamInconsistency;
pub use line::FenceMarker;
pub use partial::{OpenFence, ParseCursor};
