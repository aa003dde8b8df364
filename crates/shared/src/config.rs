//! Application configuration for TopicForge.
//!
//! User config lives at `~/.topicforge/topicforge.toml`.
//! API keys are never stored in the file; the config names the
//! environment variable that holds each key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicForgeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topicforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topicforge";

/// Default cache database file name under the config directory.
const CACHE_FILE_NAME: &str = "cache.db";

// ---------------------------------------------------------------------------
// Config structs (matching topicforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion backend settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Web-search backend settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Base URL of the chat-completion API. Overridable for compatible
    /// gateways and test servers.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model used to resolve titles into long-form content.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Model used to extract titles from raw input text.
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (interception-proxy deployments).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            base_url: default_openai_base_url(),
            generation_model: default_generation_model(),
            extraction_model: default_extraction_model(),
            timeout_secs: default_openai_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_generation_model() -> String {
    "gpt-4o-mini".into()
}
fn default_extraction_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_openai_timeout() -> u64 {
    60
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Programmable Search engine identifier (the `cx` parameter).
    /// Not a secret, so it may live in the file.
    #[serde(default)]
    pub engine_id: String,

    /// Base URL of the search API.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id: String::new(),
            base_url: default_search_base_url(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_search_timeout() -> u64 {
    8
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Override for the cache database path.
    /// Defaults to `~/.topicforge/cache.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topicforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topicforge/topicforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the cache database path from config, falling back to the default
/// location under the config directory.
pub fn cache_db_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.cache.db_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config_dir()?.join(CACHE_FILE_NAME)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TopicForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the chat-completion API key env var is set and non-empty.
///
/// The search key is deliberately not validated here: a missing search key
/// only degrades augmentation, it does not block a run.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(TopicForgeError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("customsearch"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.openai.generation_model, "gpt-4o-mini");
        assert_eq!(parsed.openai.extraction_model, "gpt-3.5-turbo");
        assert_eq!(parsed.search.timeout_secs, 8);
        assert!(!parsed.openai.accept_invalid_certs);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[openai]
generation_model = "gpt-4o"

[search]
engine_id = "abc123"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.openai.generation_model, "gpt-4o");
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.search.engine_id, "abc123");
        assert_eq!(config.search.api_key_env, "GOOGLE_API_KEY");
        assert!(config.cache.db_path.is_none());
    }

    #[test]
    fn cache_path_override() {
        let mut config = AppConfig::default();
        config.cache.db_path = Some("/tmp/custom-cache.db".into());
        let path = cache_db_path(&config).expect("resolve cache path");
        assert_eq!(path, PathBuf::from("/tmp/custom-cache.db"));
    }

    #[test]
    fn cache_path_defaults_under_config_dir() {
        let config = AppConfig::default();
        let path = cache_db_path(&config).expect("resolve cache path");
        assert!(path.ends_with(".topicforge/cache.db"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openai.api_key_env = "TF_TEST_NONEXISTENT_KEY_98765".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
