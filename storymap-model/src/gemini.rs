//! Gemini `generateContent` REST provider.

use crate::config::{ProviderKind, TaskModels};
use crate::http::{build_client, send_json};
use crate::rate_tracker::ModelQuota;
use crate::{ChatRequest, Outcome, Provider, ProviderRequest, TaskType};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storymap_core::Result;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini Flash requests per day.
pub const DEFAULT_FLASH_LIMIT: u32 = 1400;
/// Default Gemini Pro requests per day.
pub const DEFAULT_PRO_LIMIT: u32 = 45;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name used for routing and rate tracking.
    pub provider_name: String,
    pub api_key: String,
    pub base_url: String,
    pub models: TaskModels,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            provider_name: "gemini".to_string(),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
            models: ProviderKind::Gemini.default_models(),
        }
    }

    #[must_use]
    pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
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

    /// Free-tier daily quotas keyed by model family.
    pub fn default_quotas() -> Vec<ModelQuota> {
        vec![ModelQuota::new("flash", DEFAULT_FLASH_LIMIT), ModelQuota::new("pro", DEFAULT_PRO_LIMIT)]
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        Ok(Self { client: build_client()?, config })
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for GeminiProvider {
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
        true
    }

    fn build_request(&self, request: &ChatRequest, task: TaskType) -> ProviderRequest {
        ProviderRequest {
            model: self.model_for(task).to_string(),
            timeout: request.timeout,
            body: json!({
                "systemInstruction": { "parts": [{ "text": request.system }] },
                "contents": [{ "role": "user", "parts": [{ "text": request.user }] }],
                "generationConfig": {
                    "temperature": request.temperature,
                    "responseMimeType": "application/json",
                },
            }),
        }
    }

    async fn call(&self, request: ProviderRequest) -> Outcome {
        let builder = self
            .client
            .post(self.api_url(&request.model))
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&request.body);

        match send_json::<GenerateContentResponse>(builder, &self.config.provider_name).await {
            Ok(response) => {
                let text = response
                    .candidates
                    .into_iter()
                    .next()
                    .and_then(|c| c.content)
                    .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect::<String>())
                    .unwrap_or_default();
                Outcome::Success(text)
            }
            Err(outcome) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider = GeminiProvider::new(GeminiConfig::new("key")).unwrap();
        let request = provider.build_request(
            &ChatRequest::new("sys", "user").with_temperature(0.3),
            TaskType::Generation,
        );
        assert_eq!(request.model, "gemini-2.5-pro");
        assert_eq!(request.body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(request.body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(request.body["contents"][0]["parts"][0]["text"], "user");
    }

    #[test]
    fn test_default_quotas() {
        let quotas = GeminiConfig::default_quotas();
        assert_eq!(quotas[0], ModelQuota::new("flash", 1400));
        assert_eq!(quotas[1], ModelQuota::new("pro", 45));
    }
}
