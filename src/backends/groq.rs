//! Groq client implementation of [`Generator`].
//!
//! Groq exposes an OpenAI-compatible chat completion API; each prompt is sent
//! as a single user message and the first choice's text is returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{context::RunContext, error::LLMError, generator::Generator};

pub const DEFAULT_GROQ_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const CHAT_PATH: &str = "/chat/completions";

/// Client for Groq's hosted models.
#[derive(Debug, Clone)]
pub struct Groq {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct GroqChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GroqChatRequest<'a> {
    messages: Vec<GroqChatMessage<'a>>,
    model: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GroqChatResponse {
    choices: Vec<GroqChatChoice>,
    error: Option<GroqApiError>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GroqChatChoice {
    message: GroqChatMsg,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GroqChatMsg {
    content: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GroqApiError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

impl Groq {
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, api_key, model)
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        model: Option<String>,
    ) -> Result<Self, LLMError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LLMError::AuthError("Groq API key is required".to_string()));
        }
        Ok(Self {
            api_key,
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            client,
        })
    }

    /// Points the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, prompt: &str) -> Result<String, LLMError> {
        let body = GroqChatRequest {
            messages: vec![GroqChatMessage {
                role: "user",
                content: prompt,
            }],
            model: &self.model,
            stream: false,
        };
        let url = format!("{}{CHAT_PATH}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        log::debug!("Groq HTTP status: {status}");
        let raw = resp.text().await?;

        let parsed: GroqChatResponse = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) if status.is_success() => {
                return Err(LLMError::ResponseFormatError {
                    message: format!("failed to decode Groq response: {err}"),
                    raw_response: raw,
                })
            }
            Err(_) => {
                return Err(LLMError::ProviderError(format!(
                    "Groq API request failed with status {status}. Raw: {raw}"
                )))
            }
        };

        if let Some(error) = parsed.error {
            let message = format!(
                "Groq API error: {} (type: {}, code: {}, status {})",
                error.message,
                error.kind.as_deref().unwrap_or("unknown"),
                error.code.as_deref().unwrap_or("none"),
                status.as_u16()
            );
            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthError(message),
                _ => LLMError::ProviderError(message),
            });
        }
        if !status.is_success() {
            return Err(LLMError::ProviderError(format!(
                "Groq API request failed with status {status}. Raw: {raw}"
            )));
        }

        match parsed.choices.into_iter().next() {
            Some(choice) if !choice.message.content.trim().is_empty() => {
                Ok(choice.message.content.trim().to_string())
            }
            choice => {
                log::debug!(
                    "empty Groq completion (finish reason: {})",
                    choice
                        .and_then(|c| c.finish_reason)
                        .as_deref()
                        .unwrap_or("n/a")
                );
                Err(LLMError::ResponseFormatError {
                    message: "Groq response contained no choices or empty message content"
                        .to_string(),
                    raw_response: raw,
                })
            }
        }
    }
}

#[async_trait]
impl Generator for Groq {
    async fn generate(&self, ctx: &RunContext, prompt: &str) -> Result<String, LLMError> {
        ctx.run_until_done(self.request(prompt))
            .await
            .map_err(LLMError::Cancelled)?
    }

    fn provider_name(&self) -> &str {
        "groq"
    }
}
