//! Stock generator backends and the factory that selects between them.

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "groq")]
pub mod groq;
#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(feature = "groq", feature = "gemini"))]
use crate::config::ProviderConfig;
use crate::{
    config::GeneratorConfig,
    error::LLMError,
    generator::{Generator, GeneratorFactory},
};

/// Factory that picks a backend from `default_provider`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFactory;

impl GeneratorFactory for ProviderFactory {
    fn create(
        &self,
        config: &GeneratorConfig,
        debug: bool,
    ) -> Result<Box<dyn Generator>, LLMError> {
        let provider = config
            .active_provider()
            .map_err(|err| LLMError::InvalidRequest(err.to_string()))?;
        let name = config.default_provider.as_str();
        if debug {
            log::debug!(
                "creating {name} generator (model: {})",
                provider.model.as_deref().unwrap_or("default")
            );
        }

        match name {
            #[cfg(feature = "ollama")]
            "ollama" => {
                let base_url = provider.base_url.as_deref().unwrap_or_default();
                if base_url.is_empty() {
                    return Err(LLMError::InvalidRequest(
                        "base URL for Ollama not found in configuration".to_string(),
                    ));
                }
                let client = ollama::Ollama::new(
                    base_url,
                    provider.model.clone(),
                    config.request_timeout(),
                )?;
                Ok(Box::new(client))
            }
            #[cfg(feature = "groq")]
            "groq" => {
                let api_key = required_api_key(provider, "Groq")?;
                let mut client =
                    groq::Groq::new(api_key, provider.model.clone(), config.request_timeout())?;
                if let Some(base_url) = provider.base_url.as_deref().filter(|u| !u.is_empty()) {
                    client = client.with_base_url(base_url);
                }
                Ok(Box::new(client))
            }
            #[cfg(feature = "gemini")]
            "gemini" => {
                let api_key = required_api_key(provider, "Gemini")?;
                let mut client =
                    gemini::Gemini::new(api_key, provider.model.clone(), config.request_timeout())?;
                if let Some(base_url) = provider.base_url.as_deref().filter(|u| !u.is_empty()) {
                    client = client.with_base_url(base_url);
                }
                Ok(Box::new(client))
            }
            other => Err(LLMError::InvalidRequest(format!(
                "unsupported LLM provider: {other}"
            ))),
        }
    }
}

#[cfg(any(feature = "groq", feature = "gemini"))]
fn required_api_key<'a>(provider: &'a ProviderConfig, label: &str) -> Result<&'a str, LLMError> {
    match provider.api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(LLMError::InvalidRequest(format!(
            "API key for {label} not found in configuration"
        ))),
    }
}
