//! Configuration loading, validation, and management for sessiondigest.
//!
//! Loads configuration from `~/.sessiondigest/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup; the pipeline only ever sees the resolved [`AppConfig`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.sessiondigest/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Which LLM backend to target
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier passed to the provider
    #[serde(default = "default_model")]
    pub model_name: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling seed for backends that support it
    #[serde(default = "default_seed", skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Where session inputs are read from when no path is given
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Where processed records and copied artifacts are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to call the LLM for enrichment
    #[serde(default)]
    pub enrichment_enabled: bool,

    /// Fail a session when its enrichment fails instead of degrading it
    #[serde(default)]
    pub enrichment_required: bool,

    #[serde(default)]
    pub enrichment_mode: EnrichmentMode,

    /// Per-call timeout for enrichment requests
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Sessions processed at once (1 = sequential)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Provider-specific configurations, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_seed() -> Option<u64> {
    Some(42)
}
fn default_input_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_request_timeout() -> u64 {
    60
}
fn default_max_concurrency() -> usize {
    1
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("seed", &self.seed)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("enrichment_enabled", &self.enrichment_enabled)
            .field("enrichment_required", &self.enrichment_required)
            .field("enrichment_mode", &self.enrichment_mode)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrency", &self.max_concurrency)
            .field("providers", &self.providers)
            .finish()
    }
}

/// The LLM backends sessiondigest knows how to reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    TogetherAi,
    OpenRouter,
    Ollama,
    /// Any OpenAI-compatible endpoint; needs `providers.custom.api_url`
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::TogetherAi => "togetherai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Custom => "custom",
        }
    }

    /// Provider-specific environment variable holding the API key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::TogetherAi => Some("TOGETHER_API_KEY"),
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::Ollama | ProviderKind::Custom => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "togetherai" | "together" => Ok(ProviderKind::TogetherAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "ollama" => Ok(ProviderKind::Ollama),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider '{other}' (expected openai, togetherai, openrouter, ollama or custom)"
            ))),
        }
    }
}

/// How the enrichment reply is requested and interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentMode {
    /// JSON object validated against the indicator-analysis shape
    #[default]
    Structured,
    /// Free text
    Text,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sessiondigest/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load configuration from `path` and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
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

    /// Apply environment overrides through `lookup`.
    ///
    /// - `SESSIONDIGEST_PROVIDER` / `SESSIONDIGEST_MODEL` override the backend
    /// - `SESSIONDIGEST_API_KEY`, then the provider's own key variable
    ///   (`OPENAI_API_KEY`, `TOGETHER_API_KEY`, ...), fill a missing key
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("SESSIONDIGEST_PROVIDER") {
            self.provider = provider.parse()?;
        }

        if let Some(model) = lookup("SESSIONDIGEST_MODEL") {
            self.model_name = model;
        }

        if self.api_key.is_none() {
            self.api_key = lookup("SESSIONDIGEST_API_KEY")
                .or_else(|| self.provider.api_key_env().and_then(&lookup));
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sessiondigest")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be at least 1".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }

        if self.enrichment_required && !self.enrichment_enabled {
            return Err(ConfigError::ValidationError(
                "enrichment_required needs enrichment_enabled = true".into(),
            ));
        }

        if self.provider == ProviderKind::Custom
            && self
                .providers
                .get("custom")
                .and_then(|p| p.api_url.as_ref())
                .is_none()
        {
            return Err(ConfigError::ValidationError(
                "provider 'custom' needs providers.custom.api_url".into(),
            ));
        }

        Ok(())
    }

    /// The API key for the selected provider: per-provider key first, then
    /// the global one.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.providers
            .get(self.provider.as_str())
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.resolved_api_key().is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: ProviderKind::default(),
            model_name: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            seed: default_seed(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            enrichment_enabled: false,
            enrichment_required: false,
            enrichment_mode: EnrichmentMode::default(),
            request_timeout_secs: default_request_timeout(),
            max_concurrency: default_max_concurrency(),
            providers: HashMap::new(),
        }
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
