//! Shared error model, configuration, and cancellation for TopicForge.
//!
//! This crate is the foundation depended on by all other TopicForge crates.
//! It provides:
//! - [`TopicForgeError`], the unified error type
//! - Configuration ([`AppConfig`], config loading and key validation)
//! - [`CancelFlag`], the per-run cooperative cancellation token

pub mod cancel;
pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use cancel::CancelFlag;
pub use config::{
    AppConfig, CacheConfig, OpenAiConfig, SearchConfig, cache_db_path, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{Result, TopicForgeError};
