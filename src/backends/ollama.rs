//! Ollama client implementation of [`Generator`].
//!
//! Talks to a self-hosted Ollama server through its non-streaming
//! `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{context::RunContext, error::LLMError, generator::Generator};

pub const DEFAULT_OLLAMA_MODEL: &str = "gemma:2b";
const GENERATE_PATH: &str = "/api/generate";

/// Client for one Ollama server and model.
#[derive(Debug, Clone)]
pub struct Ollama {
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct OllamaGenerateResponse {
    response: String,
    done: bool,
    error: Option<String>,
}

impl Ollama {
    /// Creates a client after checking that `base_url` is an http(s) URL.
    pub fn new(
        base_url: &str,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url, model)
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        base_url: &str,
        model: Option<String>,
    ) -> Result<Self, LLMError> {
        if base_url.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Ollama base URL is required".to_string(),
            ));
        }
        let parsed = Url::parse(base_url).map_err(|err| {
            LLMError::InvalidRequest(format!("invalid Ollama base URL '{base_url}': {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LLMError::InvalidRequest(format!(
                "Ollama base URL scheme must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, prompt: &str) -> Result<String, LLMError> {
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let url = format!("{}{GENERATE_PATH}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        log::debug!("Ollama HTTP status: {status}");
        let raw = resp.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<OllamaGenerateResponse>(&raw)
                .ok()
                .and_then(|r| r.error);
            return Err(match detail {
                Some(error) => LLMError::ProviderError(format!(
                    "Ollama API error (status {}): {error}",
                    status.as_u16()
                )),
                None => LLMError::ProviderError(format!(
                    "Ollama API request failed with status {status}. Raw: {raw}"
                )),
            });
        }

        let parsed: OllamaGenerateResponse =
            serde_json::from_str(&raw).map_err(|err| LLMError::ResponseFormatError {
                message: format!("failed to decode Ollama response: {err}"),
                raw_response: raw.clone(),
            })?;

        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Err(LLMError::ProviderError(format!(
                "Ollama returned an error in response: {error}"
            )));
        }
        if !parsed.done && parsed.response.is_empty() {
            return Err(LLMError::ResponseFormatError {
                message: "response not done but no text was returned".to_string(),
                raw_response: raw,
            });
        }
        Ok(parsed.response)
    }
}

#[async_trait]
impl Generator for Ollama {
    async fn generate(&self, ctx: &RunContext, prompt: &str) -> Result<String, LLMError> {
        ctx.run_until_done(self.request(prompt))
            .await
            .map_err(LLMError::Cancelled)?
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
