//! Anthropic Messages API provider (single-shot).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chatbot::provider::{Prompt, Provider, ProviderError};
use crate::config::ProviderConfig;

const PROVIDER_ID: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    config: ProviderConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl ClaudeProvider {
    pub fn new(config: ProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system: &prompt.system,
            messages: vec![ApiMessage {
                role: "user",
                content: &prompt.user,
            }],
        }
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER_ID, status, &body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(PROVIDER_ID, format!("Parse error: {e}")))?;

        api_response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ProviderError::transient(PROVIDER_ID, "Empty response"))
    }
}
