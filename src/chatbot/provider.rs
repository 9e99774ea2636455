//! AI provider capability and error classification.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tracing::info;

use crate::chatbot::claude::ClaudeProvider;
use crate::chatbot::gemini::GeminiProvider;
use crate::chatbot::openai::OpenAiProvider;
use crate::config::{ProviderConfig, ProviderKind};

/// How the circuit breaker should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Timeouts, rate limits, server errors. Try again next message.
    Transient,
    /// The configured model or endpoint doesn't exist.
    Permanent,
    /// Credentials rejected.
    Auth,
    /// The response stream broke after it started.
    Stream,
}

impl ProviderErrorKind {
    /// Whether this failure should disable the provider for good.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, Self::Permanent | Self::Auth)
    }
}

#[derive(Debug, Error)]
#[error("{provider} ({kind:?}): {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn transient(provider: &str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Transient, message)
    }

    pub fn stream(provider: &str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Stream, message)
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let kind = match status {
            404 => ProviderErrorKind::Permanent,
            401 | 403 => ProviderErrorKind::Auth,
            _ if error_code(body).as_deref() == Some("model_not_found") => {
                ProviderErrorKind::Permanent
            }
            _ => ProviderErrorKind::Transient,
        };
        Self::new(provider, kind, format!("HTTP {status}: {}", truncate_body(body)))
    }

    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        Self::transient(provider, format!("HTTP error: {err}"))
    }
}

/// Structured `error.code` field from an OpenAI-style error body.
pub(crate) fn error_code(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("code")?
        .as_str()
        .map(str::to_string)
}

const MAX_ERROR_BODY: usize = 300;

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY {
        let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{truncated}...")
    } else {
        body.to_string()
    }
}

/// What gets sent to a provider.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Lazy, finite, non-restartable sequence of reply fragments.
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send + 'a>>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name used in logs.
    fn id(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether the chain should consume `generate_stream` instead of `generate`.
    fn streaming(&self) -> bool {
        false
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;

    fn generate_stream<'a>(&'a self, prompt: &'a Prompt) -> TextStream<'a> {
        Box::pin(futures::stream::once(self.generate(prompt)))
    }
}

/// Build providers from config, in priority order.
///
/// Entries without an API key are skipped.
pub fn build_providers(
    configs: &[ProviderConfig],
    request_timeout: Duration,
) -> Result<Vec<Arc<dyn Provider>>, reqwest::Error> {
    let http = reqwest::Client::builder().timeout(request_timeout).build()?;

    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
    for config in configs {
        if config.api_key.trim().is_empty() {
            info!("Skipping {} provider ({}): no API key", config.kind.as_str(), config.model);
            continue;
        }
        let provider: Arc<dyn Provider> = match config.kind {
            ProviderKind::Openai => Arc::new(OpenAiProvider::new(config.clone(), http.clone())),
            ProviderKind::Anthropic => Arc::new(ClaudeProvider::new(config.clone(), http.clone())),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(config.clone(), http.clone())),
        };
        info!(
            "Provider #{}: {} (model: {}, streaming: {})",
            providers.len() + 1,
            provider.id(),
            provider.model(),
            provider.streaming()
        );
        providers.push(provider);
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_status_classification() {
        assert_eq!(ProviderError::from_status("x", 404, "").kind, ProviderErrorKind::Permanent);
        assert_eq!(ProviderError::from_status("x", 401, "").kind, ProviderErrorKind::Auth);
        assert_eq!(ProviderError::from_status("x", 403, "").kind, ProviderErrorKind::Auth);
        assert_eq!(ProviderError::from_status("x", 429, "").kind, ProviderErrorKind::Transient);
        assert_eq!(ProviderError::from_status("x", 500, "").kind, ProviderErrorKind::Transient);
        assert_eq!(ProviderError::from_status("x", 408, "").kind, ProviderErrorKind::Transient);
    }

    #[test]
    fn test_model_not_found_code_is_permanent() {
        let body = r#"{"error":{"message":"The model `gpt-9` does not exist","code":"model_not_found"}}"#;
        let err = ProviderError::from_status("openai", 400, body);
        assert_eq!(err.kind, ProviderErrorKind::Permanent);
    }

    #[test]
    fn test_message_text_is_not_sniffed() {
        // Only the structured code counts, not the wording
        let body = r#"{"error":{"message":"model not found","code":"rate_limited"}}"#;
        let err = ProviderError::from_status("openai", 400, body);
        assert_eq!(err.kind, ProviderErrorKind::Transient);
        assert_eq!(error_code("not json"), None);
    }

    #[test]
    fn test_breaker_kinds() {
        assert!(ProviderErrorKind::Permanent.trips_breaker());
        assert!(ProviderErrorKind::Auth.trips_breaker());
        assert!(!ProviderErrorKind::Transient.trips_breaker());
        assert!(!ProviderErrorKind::Stream.trips_breaker());
    }

    #[test]
    fn test_long_body_truncated() {
        let body = "e".repeat(1000);
        let err = ProviderError::from_status("x", 500, &body);
        assert!(err.message.len() < 400);
        assert!(err.message.ends_with("..."));
    }

    struct Fixed;

    #[async_trait]
    impl Provider for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "m"
        }

        async fn generate(&self, _prompt: &Prompt) -> Result<String, ProviderError> {
            Ok("sup".to_string())
        }
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_fragment() {
        let prompt = Prompt {
            system: String::new(),
            user: "hi".to_string(),
        };
        let provider = Fixed;
        let fragments: Vec<_> = provider.generate_stream(&prompt).collect().await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "sup");
    }

    #[test]
    fn test_skips_providers_without_key() {
        let configs = vec![
            ProviderConfig::for_test(ProviderKind::Openai, "", "gpt-4o-mini"),
            ProviderConfig::for_test(ProviderKind::Gemini, "key", "gemini-2.0-flash"),
        ];
        let providers = build_providers(&configs, Duration::from_secs(5)).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id(), "gemini");
    }
}
