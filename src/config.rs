use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::classifier::Category;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (OpenAI, Groq, OpenRouter, ...).
    Openai,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

#[derive(Deserialize)]
struct ProviderFile {
    kind: ProviderKind,
    #[serde(default)]
    api_key: String,
    model: String,
    base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    /// Defaults to true for OpenAI-compatible endpoints, false otherwise.
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// AI providers in priority order.
    #[serde(default)]
    providers: Vec<ProviderFile>,
    #[serde(default = "default_reaction_probability")]
    reaction_probability: f64,
    /// Number of past turns included in provider prompts.
    #[serde(default = "default_history_window")]
    history_window: usize,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// Per-category phrase overrides, keyed by category name.
    #[serde(default)]
    phrases: HashMap<Category, Vec<String>>,
    #[serde(default)]
    reactions: Vec<String>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.9
}

fn default_reaction_probability() -> f64 {
    0.15
}

fn default_history_window() -> usize {
    6
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// A configured AI provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[cfg(test)]
impl ProviderConfig {
    pub fn for_test(kind: ProviderKind, api_key: &str, model: &str) -> Self {
        Self {
            kind,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: kind.default_base_url().to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stream: kind == ProviderKind::Openai,
        }
    }
}

pub struct Config {
    pub telegram_bot_token: String,
    /// Providers in priority order (first = tried first).
    pub providers: Vec<ProviderConfig>,
    pub reaction_probability: f64,
    pub history_window: usize,
    pub request_timeout: Duration,
    pub phrases: HashMap<Category, Vec<String>>,
    pub reactions: Vec<String>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if !(0.0..=1.0).contains(&file.reaction_probability) {
            return Err(ConfigError::Validation(format!(
                "reaction_probability must be between 0 and 1, got {}",
                file.reaction_probability
            )));
        }
        if file.request_timeout_secs == 0 {
            return Err(ConfigError::Validation("request_timeout_secs must be positive".into()));
        }

        let providers = file
            .providers
            .into_iter()
            .map(|p| {
                if p.model.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{} provider is missing a model",
                        p.kind.as_str()
                    )));
                }
                Ok(ProviderConfig {
                    kind: p.kind,
                    api_key: p.api_key,
                    base_url: p
                        .base_url
                        .unwrap_or_else(|| p.kind.default_base_url().to_string())
                        .trim_end_matches('/')
                        .to_string(),
                    model: p.model,
                    max_tokens: p.max_tokens,
                    temperature: p.temperature,
                    stream: p.stream.unwrap_or(p.kind == ProviderKind::Openai),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            providers,
            reaction_probability: file.reaction_probability,
            history_window: file.history_window,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            phrases: file.phrases,
            reactions: file.reactions,
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert!(config.providers.is_empty());
        assert_eq!(config.reaction_probability, 0.15);
        assert_eq!(config.history_window, 6);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_providers_keep_order_and_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "providers": [
                { "kind": "openai", "api_key": "gsk", "model": "llama-3.1-8b-instant",
                  "base_url": "https://api.groq.com/openai/v1/" },
                { "kind": "gemini", "api_key": "g", "model": "gemini-2.0-flash", "temperature": 0.5 },
                { "kind": "anthropic", "model": "claude-haiku-4-5", "stream": true }
            ]
        }"#);
        let config = Config::load(file.path()).unwrap();
        let kinds: Vec<ProviderKind> = config.providers.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ProviderKind::Openai, ProviderKind::Gemini, ProviderKind::Anthropic]);

        let groq = &config.providers[0];
        assert_eq!(groq.base_url, "https://api.groq.com/openai/v1");
        assert!(groq.stream);
        assert_eq!(groq.max_tokens, 150);

        let gemini = &config.providers[1];
        assert!(!gemini.stream);
        assert_eq!(gemini.temperature, 0.5);
        assert_eq!(gemini.base_url, "https://generativelanguage.googleapis.com/v1beta");

        let claude = &config.providers[2];
        assert!(claude.api_key.is_empty());
        assert!(claude.stream);
    }

    #[test]
    fn test_phrase_overrides() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "phrases": { "how_are_you": ["chillin"], "bye": ["later!"] },
            "reactions": ["😂"]
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.phrases[&Category::HowAreYou], vec!["chillin"]);
        assert_eq!(config.phrases[&Category::Bye], vec!["later!"]);
        assert_eq!(config.reactions, vec!["😂"]);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "phrases": { "sarcasm": ["sure"] }
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(r#"{{ "telegram_bot_token": "{token}" }}"#));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_reaction_probability_range() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "reaction_probability": 1.5
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("reaction_probability"));
    }

    #[test]
    fn test_provider_without_model() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "providers": [{ "kind": "gemini", "api_key": "k", "model": " " }]
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("missing a model"));
    }

    #[test]
    fn test_unknown_provider_kind() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "providers": [{ "kind": "mystery", "model": "m" }]
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
