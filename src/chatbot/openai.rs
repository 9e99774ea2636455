//! OpenAI-compatible chat completions provider.
//!
//! Works with anything speaking the `/chat/completions` dialect (OpenAI,
//! Groq, OpenRouter). Streams server-sent events when `stream` is set.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chatbot::provider::{Prompt, Provider, ProviderError, ProviderErrorKind, TextStream};
use crate::config::ProviderConfig;

const PROVIDER_ID: &str = "openai";

pub struct OpenAiProvider {
    config: ProviderConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    message: Option<String>,
    code: Option<serde_json::Value>,
}

/// Result of parsing one SSE `data:` payload.
#[derive(Debug, PartialEq)]
enum SseData {
    Text(String),
    Done,
    Skip,
    Error(ProviderErrorKind, String),
}

fn parse_sse_data(data: &str) -> SseData {
    let data = data.trim();
    if data == "[DONE]" {
        return SseData::Done;
    }
    let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
        return SseData::Skip;
    };
    if let Some(error) = event.error {
        let kind = match error.code.as_ref().and_then(|c| c.as_str()) {
            Some("model_not_found") => ProviderErrorKind::Permanent,
            _ => ProviderErrorKind::Stream,
        };
        return SseData::Error(kind, error.message.unwrap_or_else(|| "stream error".to_string()));
    }
    let text: String = event
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();
    if text.is_empty() {
        SseData::Skip
    } else {
        SseData::Text(text)
    }
}

/// Take one complete line off the front of `buffer`.
///
/// Works on bytes so a character split across network chunks is only decoded
/// once its line is complete.
fn next_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn request<'a>(&'a self, prompt: &'a Prompt, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream,
        }
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&self.request(prompt, stream))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER_ID, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(PROVIDER_ID, status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn streaming(&self) -> bool {
        self.config.stream
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let response = self.send(prompt, false).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(PROVIDER_ID, format!("Parse error: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::transient(PROVIDER_ID, "Empty response"))
    }

    fn generate_stream<'a>(&'a self, prompt: &'a Prompt) -> TextStream<'a> {
        Box::pin(async_stream::stream! {
            let response = match self.send(prompt, true).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(ProviderError::stream(PROVIDER_ID, format!("Stream error: {e}")));
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                while let Some(line) = next_line(&mut buffer) {
                    let Some(data) = line.trim_end().strip_prefix("data:") else {
                        continue;
                    };
                    match parse_sse_data(data) {
                        SseData::Text(text) => yield Ok(text),
                        SseData::Done => {
                            debug!("openai stream finished");
                            return;
                        }
                        SseData::Skip => {}
                        SseData::Error(kind, message) => {
                            yield Err(ProviderError::new(PROVIDER_ID, kind, message));
                            return;
                        }
                    }
                }
            }

            // Last event without a trailing newline
            let rest = String::from_utf8_lossy(&buffer);
            if let Some(data) = rest.trim().strip_prefix("data:") {
                match parse_sse_data(data) {
                    SseData::Text(text) => yield Ok(text),
                    SseData::Error(kind, message) => {
                        yield Err(ProviderError::new(PROVIDER_ID, kind, message));
                    }
                    SseData::Done | SseData::Skip => {}
                }
            }
        })
    }
}
