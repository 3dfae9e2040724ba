use crate::retry::is_retryable_error_message;

/// Result of a single provider call.
///
/// The orchestrator folds over these: `Success` returns, `Retryable` moves on
/// to the next provider, `Fatal` stops the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Retryable(String),
    Fatal(String),
}

impl Outcome {
    /// Classify a provider-reported error message by its quota and
    /// availability signals.
    ///
    /// ```rust
    /// use storymap_model::Outcome;
    ///
    /// assert!(matches!(Outcome::from_error_message("Too Many Requests"), Outcome::Retryable(_)));
    /// assert!(matches!(Outcome::from_error_message("invalid api key"), Outcome::Fatal(_)));
    /// ```
    pub fn from_error_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_retryable_error_message(&message) {
            Outcome::Retryable(message)
        } else {
            Outcome::Fatal(message)
        }
    }
}
