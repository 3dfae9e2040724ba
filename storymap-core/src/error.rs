/// Caller-side precondition violations, rejected before any network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("requirements text is too short ({len} chars, minimum {min})")]
    TooShort { len: usize, min: usize },

    #[error("requirements text is too long ({len} chars, maximum {max})")]
    TooLong { len: usize, max: usize },

    #[error("prompt is too short ({len} chars, minimum {min})")]
    PromptTooShort { len: usize, min: usize },

    #[error("prompt is too long ({len} chars, maximum {max})")]
    PromptTooLong { len: usize, max: usize },

    #[error("{name} threshold {value} is outside [{min}, {max}]")]
    ThresholdOutOfRange { name: &'static str, value: f64, min: f64, max: f64 },

    #[error("duplicate threshold {duplicate} must be >= similarity threshold {similarity}")]
    ThresholdOrdering { similarity: f64, duplicate: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum StoryMapError {
    #[error("No provider configured")]
    NoProviderConfigured,

    #[error(
        "All providers failed (last provider: {last}): {last_error}",
        last = .last_provider.as_deref().unwrap_or("none")
    )]
    AllProvidersFailed { last_error: String, last_provider: Option<String> },

    /// Non-retryable failure reported by a provider. Surfaced without fallback.
    #[error("Provider {provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoryMapError>;
