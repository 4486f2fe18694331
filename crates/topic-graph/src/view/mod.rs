//! Views: which nodes and edges a display mode shows
//!
//! # Core Concepts
//!
//! - **[`ViewConfig`]**: serde-friendly description of a view
//! - **[`filter_view`]**: the staged pipeline turning a snapshot into a
//!   deterministic [`ViewOutput`]

mod config;
mod pipeline;

pub use config::{Comparator, ProblemDetails, ScoreFilter, SolutionDetails, ViewConfig, ViewType};
pub use pipeline::{filter_view, ViewOutput};
