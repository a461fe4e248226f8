//! Generator configuration, loaded from TOML.
//!
//! ```toml
//! default_provider = "ollama"
//! request_timeout_seconds = 60
//!
//! [llms.ollama]
//! base_url = "http://localhost:11434"
//! model = "llama3"
//! ```

mod load;
mod paths;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use paths::default_config_path;

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Settings for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Configuration handed to the generator factory by every worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub default_provider: String,
    pub request_timeout_seconds: i64,
    pub llms: HashMap<String, ProviderConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let mut llms = HashMap::new();
        llms.insert(
            DEFAULT_PROVIDER.to_string(),
            ProviderConfig {
                base_url: Some(DEFAULT_OLLAMA_URL.to_string()),
                ..ProviderConfig::default()
            },
        );
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            llms,
        }
    }
}

impl GeneratorConfig {
    /// Config with a single provider section, selected as the default.
    pub fn for_provider(name: impl Into<String>, provider: ProviderConfig) -> Self {
        let name = name.into();
        let mut llms = HashMap::new();
        llms.insert(name.clone(), provider);
        Self {
            default_provider: name,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            llms,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Per-request timeout; non-positive values fall back to the default.
    pub fn request_timeout(&self) -> Duration {
        let secs = if self.request_timeout_seconds > 0 {
            self.request_timeout_seconds
        } else {
            DEFAULT_REQUEST_TIMEOUT_SECS
        };
        Duration::from_secs(secs as u64)
    }

    /// Section for the default provider.
    pub fn active_provider(&self) -> Result<&ProviderConfig, ConfigError> {
        if self.default_provider.is_empty() {
            return Err(ConfigError::MissingDefaultProvider);
        }
        self.llms
            .get(&self.default_provider)
            .ok_or_else(|| ConfigError::ProviderNotConfigured(self.default_provider.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.active_provider().map(|_| ())
    }
}
