//! Language-model integration for TopicForge.
//!
//! One HTTP client ([`ChatClient`]) speaking the OpenAI-compatible chat
//! protocol, and two task-specific wrappers on top of it:
//! [`ContentGenerator`] for per-title content and [`TitleExtractor`] for
//! pulling a title list out of free-form text.

pub mod client;
pub mod extractor;
pub mod generator;

pub use client::{ChatClient, CompletionFailure};
pub use extractor::TitleExtractor;
pub use generator::ContentGenerator;
