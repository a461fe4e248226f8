//! The text-generation capability consumed by the batch engine.

use async_trait::async_trait;

use crate::{config::GeneratorConfig, context::RunContext, error::LLMError};

/// Something that turns a prompt into generated text.
///
/// Each worker owns one instance and never calls it concurrently.
/// Implementations should return promptly once `ctx` is done; the engine
/// also drops an in-flight `generate` future when the run is cancelled.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, ctx: &RunContext, prompt: &str) -> Result<String, LLMError>;

    /// Lowercase provider name, e.g. `"ollama"`.
    fn provider_name(&self) -> &str;

    /// Frees provider resources. Called exactly once when the owning worker exits.
    async fn release(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

/// Builds one generator per worker from a fixed configuration.
pub trait GeneratorFactory: Send + Sync {
    fn create(&self, config: &GeneratorConfig, debug: bool)
        -> Result<Box<dyn Generator>, LLMError>;
}

impl<F> GeneratorFactory for F
where
    F: Fn(&GeneratorConfig, bool) -> Result<Box<dyn Generator>, LLMError> + Send + Sync,
{
    fn create(
        &self,
        config: &GeneratorConfig,
        debug: bool,
    ) -> Result<Box<dyn Generator>, LLMError> {
        self(config, debug)
    }
}
