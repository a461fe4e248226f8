//! Google Gemini client implementation of [`Generator`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{context::RunContext, error::LLMError, generator::Generator};

pub const DEFAULT_GEMINI_MODEL: &str = "gemma-3-27b-it";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiTextPart<'a>>,
}

#[derive(Serialize)]
struct GeminiTextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiApiError>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GeminiCandidateContent {
    parts: Vec<GeminiResponsePart>,
}

/// Non-text parts (function calls, inline data) deserialize with `text: None`.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GeminiApiError {
    code: u16,
    message: String,
    status: Option<String>,
}

impl Gemini {
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
            return Err(LLMError::AuthError(
                "Gemini API key is required".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            client,
        })
    }

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
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiTextPart { text: prompt }],
            }],
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        log::debug!("Gemini HTTP status: {status}");
        let raw = resp.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GeminiResponse>(&raw)
                .ok()
                .and_then(|r| r.error);
            let message = match detail {
                Some(error) => format!(
                    "Gemini API error {} ({}): {}",
                    error.code,
                    error.status.as_deref().unwrap_or("UNKNOWN"),
                    error.message
                ),
                None => format!("Gemini API request failed with status {status}. Raw: {raw}"),
            };
            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthError(message),
                _ => LLMError::ProviderError(message),
            });
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&raw).map_err(|err| LLMError::ResponseFormatError {
                message: format!("failed to decode Gemini response: {err}"),
                raw_response: raw.clone(),
            })?;

        let candidate = parsed.candidates.into_iter().next();
        if candidate
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            == Some("SAFETY")
        {
            return Err(LLMError::ProviderError(
                "Gemini content generation blocked due to safety settings".to_string(),
            ));
        }
        if let Some(reason) = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .filter(|r| r != "BLOCK_REASON_UNSPECIFIED")
        {
            return Err(LLMError::ProviderError(format!(
                "Gemini prompt blocked: {reason}"
            )));
        }

        let text: String = candidate
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(LLMError::ResponseFormatError {
                message: "Gemini response contained no usable text content".to_string(),
                raw_response: raw,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Generator for Gemini {
    async fn generate(&self, ctx: &RunContext, prompt: &str) -> Result<String, LLMError> {
        ctx.run_until_done(self.request(prompt))
            .await
            .map_err(LLMError::Cancelled)?
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
