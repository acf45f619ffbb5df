//! Configuration loading, validation, and management for CodeClaw.
//!
//! Loads configuration from `~/.codeclaw/config.toml` with environment
//! variable overrides. Every field has a default, so a missing file is a
//! valid (default) configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codeclaw/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Turn limits and tool output caps
    #[serde(default)]
    pub agent: AgentConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Content index settings
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "ollama", "openai", or "none"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for a single model call
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// How long a health check result is reused
    #[serde(default = "default_health_ttl")]
    pub health_check_ttl_secs: u64,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_model_timeout() -> u64 {
    8
}
fn default_health_ttl() -> u64 {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
            health_check_ttl_secs: default_health_ttl(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("health_check_ttl_secs", &self.health_check_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Actions beyond this count in one turn are dropped
    #[serde(default = "default_max_actions")]
    pub max_actions_per_turn: usize,

    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Longer interactive input is rejected before any processing
    #[serde(default = "default_max_input")]
    pub max_input_chars: usize,

    #[serde(default = "default_read_preview")]
    pub read_preview_chars: usize,

    #[serde(default = "default_analyze_preview")]
    pub analyze_preview_chars: usize,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_command_output")]
    pub command_output_chars: usize,

    /// Session file, relative to the working directory unless absolute
    #[serde(default = "default_session_file")]
    pub session_file: String,
}

fn default_max_actions() -> usize {
    5
}
fn default_max_history() -> usize {
    100
}
fn default_max_input() -> usize {
    200
}
fn default_read_preview() -> usize {
    800
}
fn default_analyze_preview() -> usize {
    500
}
fn default_command_timeout() -> u64 {
    5
}
fn default_command_output() -> usize {
    1500
}
fn default_session_file() -> String {
    "session.json".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_actions_per_turn: default_max_actions(),
            max_history: default_max_history(),
            max_input_chars: default_max_input(),
            read_preview_chars: default_read_preview(),
            analyze_preview_chars: default_analyze_preview(),
            command_timeout_secs: default_command_timeout(),
            command_output_chars: default_command_output(),
            session_file: default_session_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_entries() -> usize {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Minimum seconds between full rebuilds of a non-empty index
    #[serde(default = "default_refresh")]
    pub refresh_secs: u64,

    #[serde(default = "default_name_results")]
    pub max_name_results: usize,

    #[serde(default = "default_content_matches")]
    pub max_content_matches: usize,

    #[serde(default = "default_matches_per_file")]
    pub max_matches_per_file: usize,

    /// Directory depth searched when resolving a bare filename
    #[serde(default = "default_resolve_depth")]
    pub resolve_max_depth: usize,
}

fn default_refresh() -> u64 {
    30
}
fn default_name_results() -> usize {
    20
}
fn default_content_matches() -> usize {
    50
}
fn default_matches_per_file() -> usize {
    10
}
fn default_resolve_depth() -> usize {
    6
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh(),
            max_name_results: default_name_results(),
            max_content_matches: default_content_matches(),
            max_matches_per_file: default_matches_per_file(),
            resolve_max_depth: default_resolve_depth(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codeclaw/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `CODECLAW_PROVIDER`, `CODECLAW_MODEL`
    /// - `CODECLAW_API_KEY`, then `OPENAI_API_KEY` (only if no key is configured)
    /// - `OLLAMA_HOST` (only for the ollama provider, only if no base URL is configured)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("CODECLAW_PROVIDER") {
            self.model.provider = provider;
        }
        if let Some(model) = var("CODECLAW_MODEL") {
            self.model.model = model;
        }
        if self.model.api_key.is_none() {
            self.model.api_key = var("CODECLAW_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }
        if self.model.base_url.is_none()
            && self.model.provider == "ollama"
            && let Some(host) = var("OLLAMA_HOST")
        {
            self.model.base_url = Some(host);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codeclaw")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let limits = [
            ("agent.max_actions_per_turn", self.agent.max_actions_per_turn),
            ("agent.max_history", self.agent.max_history),
            ("agent.max_input_chars", self.agent.max_input_chars),
            ("agent.read_preview_chars", self.agent.read_preview_chars),
            ("agent.analyze_preview_chars", self.agent.analyze_preview_chars),
            ("cache.max_entries", self.cache.max_entries),
            ("index.max_name_results", self.index.max_name_results),
            ("index.max_content_matches", self.index.max_content_matches),
            ("index.max_matches_per_file", self.index.max_matches_per_file),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!("{name} must be greater than 0")));
        }

        if self.model.timeout_secs == 0 || self.agent.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("timeouts must be greater than 0".into()));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
