use thiserror::Error;

/// Error types that can occur when a generator talks to an LLM provider.
#[derive(Debug, Clone, Error)]
pub enum LLMError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the LLM provider
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// The call was abandoned because its run context was done
    #[error("Request cancelled: {0}")]
    Cancelled(RunError),
}

/// Converts reqwest HTTP errors into LlmErrors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

/// Why a run context stopped.
///
/// Returned at run level by `process_jobs`: when present, some jobs may have
/// no result or a cancellation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("run cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Failure attached to a single job result.
///
/// The display text starts with a category prefix so reports can tell the
/// three kinds apart without matching on the enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The worker could not build its generator.
    #[error("client setup failed: {0}")]
    Setup(String),
    /// The generator returned an error for this prompt.
    #[error("generation failed: {0}")]
    Generation(String),
    /// The run context was done while the job was in flight.
    #[error("cancelled ({cause}): {message}")]
    Cancelled { cause: RunError, message: String },
}

impl JobError {
    /// Short category name, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Setup(_) => "setup",
            JobError::Generation(_) => "generation",
            JobError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, JobError::Cancelled { .. })
    }
}

/// Errors raised while turning a text source into jobs.
#[derive(Debug, Error)]
pub enum JobSourceError {
    #[error("failed to open job source {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error reading job source: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors raised while loading or validating generator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing home directory for config paths")]
    MissingHome,
    #[error("no default LLM provider specified in configuration")]
    MissingDefaultProvider,
    #[error("configuration for provider '{0}' not found")]
    ProviderNotConfigured(String),
}
