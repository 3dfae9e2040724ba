use crate::{ChatRequest, Outcome, TaskType};
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

/// Appended to the user message for providers without a native JSON mode.
pub const JSON_ONLY_INSTRUCTION: &str =
    "IMPORTANT: Return ONLY valid JSON, no additional text or markdown formatting.";

/// A request already shaped for one provider's wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub model: String,
    pub timeout: Duration,
    pub body: Value,
}

/// An LLM backend reachable through a uniform call shape.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// `false` when the provider has no credentials or failed to initialize.
    fn is_available(&self) -> bool {
        true
    }

    fn model_for(&self, task: TaskType) -> &str;

    fn supports_native_json(&self) -> bool;

    /// Translate the abstract request into this provider's call shape.
    fn build_request(&self, request: &ChatRequest, task: TaskType) -> ProviderRequest;

    async fn call(&self, request: ProviderRequest) -> Outcome;
}

/// The user message as it should be sent to a provider.
///
/// ```rust
/// use storymap_model::{ChatRequest, JSON_ONLY_INSTRUCTION, provider::user_prompt};
///
/// let request = ChatRequest::new("system", "Build a map");
/// assert_eq!(user_prompt(&request, true), "Build a map");
/// assert!(user_prompt(&request, false).ends_with(JSON_ONLY_INSTRUCTION));
/// ```
pub fn user_prompt(request: &ChatRequest, native_json: bool) -> Cow<'_, str> {
    if native_json {
        Cow::Borrowed(request.user.as_str())
    } else {
        Cow::Owned(format!("{}\n\n{}", request.user, JSON_ONLY_INSTRUCTION))
    }
}
