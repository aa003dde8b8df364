//! Orchestration layer for TopicForge.
//!
//! Ties the storage, search, and language-model crates together into the
//! title-resolution pipeline and renders its results for export.

pub mod export;
pub mod pipeline;

pub use export::{output_path, render_markdown};
pub use pipeline::{
    EventSink, Pipeline, ProgressEvent, ResultEvent, RunHandle, RunReport, RunState, SilentSink,
};
