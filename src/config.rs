//! Configuration loader and validator for the message processor.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::prompt::{PromptVariant, UnknownVariant};

pub const DEFAULT_TABLE: &str = "sms_messages";
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid PROMPT_VARIANT: {0}")]
    Variant(#[from] UnknownVariant),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub completion: Completion,
    #[serde(default)]
    pub processor: Processor,
}

/// Remote row store (PostgREST-style REST API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Store {
    #[serde(default)]
    pub url: String,
    /// Read key; used by the latest-message viewer.
    #[serde(default)]
    pub api_key: String,
    /// Elevated key; used for fetching and updating rows.
    #[serde(default)]
    pub service_role_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

/// Hosted chat-completion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Completion {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Processor {
    #[serde(default)]
    pub variant: PromptVariant,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_completion_base_url() -> String {
    DEFAULT_COMPLETION_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for Store {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            service_role_key: String::new(),
            table: default_table(),
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

impl Config {
    /// Overlay values from the environment. `lookup` returns the value of a
    /// variable; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("SUPABASE_URL") {
            self.store.url = v;
        }
        if let Some(v) = get("SUPABASE_API_KEY") {
            self.store.api_key = v;
        }
        if let Some(v) = get("SUPABASE_API_KEY_SERVICE_ROLE") {
            self.store.service_role_key = v;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.completion.api_key = v;
        }
        if let Some(v) = get("PROMPT_VARIANT") {
            self.processor.variant = v.parse()?;
        }
        Ok(())
    }
}

/// Load configuration and validate it.
/// - If `path` is Some, the YAML file is read first; otherwise defaults are used.
/// - Environment variables always override.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = read(path)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Like [`load`], but only requires what the latest-message viewer uses:
/// the store URL and its read key.
pub fn load_viewer(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = read(path)?;
    validate_viewer(&cfg)?;
    Ok(cfg)
}

fn read(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn validate_viewer(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.store.url.trim().is_empty() {
        return Err(ConfigError::Invalid("store.url (SUPABASE_URL) must be non-empty"));
    }
    if cfg.store.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("store.api_key (SUPABASE_API_KEY) must be non-empty"));
    }
    Ok(())
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.store.url.trim().is_empty() {
        return Err(ConfigError::Invalid("store.url (SUPABASE_URL) must be non-empty"));
    }
    if cfg.store.service_role_key.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "store.service_role_key (SUPABASE_API_KEY_SERVICE_ROLE) must be non-empty",
        ));
    }
    if cfg.store.table.trim().is_empty() {
        return Err(ConfigError::Invalid("store.table must be non-empty"));
    }

    if cfg.completion.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("completion.base_url must be non-empty"));
    }
    if cfg.completion.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "completion.api_key (GROQ_API_KEY) must be non-empty",
        ));
    }
    if cfg.completion.model.trim().is_empty() {
        return Err(ConfigError::Invalid("completion.model must be non-empty"));
    }
    if !(0.0..=2.0).contains(&cfg.completion.temperature) {
        return Err(ConfigError::Invalid(
            "completion.temperature must be between 0.0 and 2.0",
        ));
    }

    Ok(())
}

/// Reference YAML for a config file (`config.example.yaml`).
pub fn example() -> &'static str {
    include_str!("../config.example.yaml")
}
