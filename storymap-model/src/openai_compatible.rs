//! OpenAI-compatible chat completions (OpenAI, Groq, Perplexity).

use crate::config::{ProviderKind, TaskModels};
use crate::http::{build_client, send_json};
use crate::provider::user_prompt;
use crate::{ChatRequest, Outcome, Provider, ProviderRequest, TaskType};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storymap_core::Result;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";

/// Configuration for OpenAI-compatible providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Provider name used for routing, rate tracking and error messages.
    pub provider_name: String,
    pub api_key: String,
    pub base_url: String,
    pub models: TaskModels,
    /// Whether the endpoint honours `response_format: {"type": "json_object"}`.
    pub native_json: bool,
}

impl OpenAICompatibleConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_name: "openai".to_string(),
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            models: ProviderKind::OpenAi.default_models(),
            native_json: ProviderKind::OpenAi.supports_native_json(),
        }
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            provider_name: "groq".to_string(),
            api_key: api_key.into(),
            base_url: GROQ_API_BASE.to_string(),
            models: ProviderKind::Groq.default_models(),
            native_json: ProviderKind::Groq.supports_native_json(),
        }
    }

    pub fn perplexity(api_key: impl Into<String>) -> Self {
        Self {
            provider_name: "perplexity".to_string(),
            api_key: api_key.into(),
            base_url: PERPLEXITY_API_BASE.to_string(),
            models: ProviderKind::Perplexity.default_models(),
            native_json: ProviderKind::Perplexity.supports_native_json(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_models(mut self, models: TaskModels) -> Self {
        self.models = models;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAICompatibleProvider {
    client: Client,
    config: OpenAICompatibleConfig,
}

impl OpenAICompatibleProvider {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        Ok(Self { client: build_client()?, config })
    }

    pub fn openai(api_key: impl Into<String>) -> Result<Self> {
        Self::new(OpenAICompatibleConfig::openai(api_key))
    }

    pub fn groq(api_key: impl Into<String>) -> Result<Self> {
        Self::new(OpenAICompatibleConfig::groq(api_key))
    }

    pub fn perplexity(api_key: impl Into<String>) -> Result<Self> {
        Self::new(OpenAICompatibleConfig::perplexity(api_key))
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn model_for(&self, task: TaskType) -> &str {
        self.config.models.get(task)
    }

    fn supports_native_json(&self) -> bool {
        self.config.native_json
    }

    fn build_request(&self, request: &ChatRequest, task: TaskType) -> ProviderRequest {
        let model = self.model_for(task).to_string();
        let mut body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": user_prompt(request, self.config.native_json) },
            ],
            "temperature": request.temperature,
        });
        if self.config.native_json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        ProviderRequest { model, timeout: request.timeout, body }
    }

    async fn call(&self, request: ProviderRequest) -> Outcome {
        let builder = self
            .client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&request.body);

        match send_json::<ChatCompletionResponse>(builder, &self.config.provider_name).await {
            Ok(response) => Outcome::Success(
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message)
                    .and_then(|m| m.content)
                    .unwrap_or_default(),
            ),
            Err(outcome) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_json_uses_response_format() {
        let provider = OpenAICompatibleProvider::openai("key").unwrap();
        let request = provider.build_request(&ChatRequest::new("sys", "user"), TaskType::Generation);
        assert_eq!(request.body["response_format"]["type"], "json_object");
        assert_eq!(request.body["messages"][1]["content"], "user");
        assert_eq!(request.model, "gpt-4o");
    }

    #[test]
    fn test_perplexity_appends_json_instruction() {
        let provider = OpenAICompatibleProvider::perplexity("key").unwrap();
        let request = provider.build_request(&ChatRequest::new("sys", "user"), TaskType::Generation);
        assert!(request.body.get("response_format").is_none());
        let content = request.body["messages"][1]["content"].as_str().unwrap();
        assert!(content.ends_with(crate::JSON_ONLY_INSTRUCTION));
    }

    #[test]
    fn test_model_per_task() {
        let models = TaskModels {
            enhancement: "fast".to_string(),
            generation: "big".to_string(),
            assistant: "chat".to_string(),
        };
        let provider =
            OpenAICompatibleProvider::new(OpenAICompatibleConfig::groq("key").with_models(models)).unwrap();
        assert_eq!(provider.model_for(TaskType::Enhancement), "fast");
        assert_eq!(provider.model_for(TaskType::Generation), "big");
        assert_eq!(provider.model_for(TaskType::Assistant), "chat");
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        assert!(!OpenAICompatibleProvider::groq("").unwrap().is_available());
    }
}
