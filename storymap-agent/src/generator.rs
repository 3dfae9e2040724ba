//! Requirements text to [`StoryMap`] through the provider chain.

use crate::config::GenerationConfig;
use crate::response::parse_response;
use crate::{cached, prompt};
use std::sync::Arc;
use storymap_core::{Cache, InputError, Result, StoryMap, cache_key};
use storymap_model::{ChatRequest, ConfigError, OrchestratorRegistry, TaskType};
use storymap_telemetry::{generation_span, info, record_cache_hit};
use tracing::Instrument;

/// Requirements shorter than this (after trimming) are rejected.
pub const MIN_REQUIREMENTS_CHARS: usize = 10;
pub const MAX_REQUIREMENTS_CHARS: usize = 10_000;

/// A parsed map and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMap {
    pub map: StoryMap,
    /// Provider that answered; `None` when served from cache.
    pub provider: Option<String>,
    pub from_cache: bool,
}

pub struct MapGenerator {
    registry: Arc<OrchestratorRegistry>,
    config: GenerationConfig,
}

impl MapGenerator {
    pub fn new(registry: Arc<OrchestratorRegistry>) -> Self {
        Self { registry, config: GenerationConfig::default() }
    }

    /// Replace the generation settings after checking them.
    pub fn with_config(mut self, config: GenerationConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<OrchestratorRegistry> {
        &self.registry
    }

    /// Cache key for `requirements` in the configured language.
    pub fn cache_key(&self, requirements: &str) -> String {
        cache_key(&self.config.cache_prefix, &[self.config.language.code(), requirements])
    }

    /// Generate a map for `requirements`.
    ///
    /// A fresh cache entry is returned as-is without calling any provider.
    /// Cache failures are logged and otherwise ignored.
    pub async fn generate(&self, requirements: &str, cache: Option<&dyn Cache>) -> Result<GeneratedMap> {
        check_requirements(requirements)?;

        self.generate_checked(requirements, cache)
            .instrument(generation_span(requirements.chars().count()))
            .await
    }

    async fn generate_checked(&self, requirements: &str, cache: Option<&dyn Cache>) -> Result<GeneratedMap> {
        let key = self.cache_key(requirements);

        if let Some(cache) = cache {
            if let Some(map) = cached::read::<StoryMap>(cache, &key).await {
                record_cache_hit(true);
                info!(stories = map.story_count(), "Using cached story map");
                return Ok(GeneratedMap { map, provider: None, from_cache: true });
            }
        }
        record_cache_hit(false);

        let language = self.config.language;
        let request =
            ChatRequest::new(prompt::generation_system(language), prompt::generation_user(requirements, language))
                .with_temperature(self.config.temperature)
                .with_timeout(self.config.timeout);

        let response = self.registry.send_default(&request, TaskType::Generation).await?;
        let map: StoryMap = parse_response(&response.text)?;
        info!(
            provider = %response.provider,
            activities = map.activities.len(),
            stories = map.story_count(),
            "Story map generated"
        );

        if let Some(cache) = cache {
            cached::write(cache, &key, &map, self.config.cache_ttl).await;
        }

        Ok(GeneratedMap { map, provider: Some(response.provider), from_cache: false })
    }
}

fn check_requirements(text: &str) -> std::result::Result<(), InputError> {
    let trimmed = text.trim().chars().count();
    if trimmed < MIN_REQUIREMENTS_CHARS {
        return Err(InputError::TooShort { len: trimmed, min: MIN_REQUIREMENTS_CHARS });
    }
    let len = text.chars().count();
    if len > MAX_REQUIREMENTS_CHARS {
        return Err(InputError::TooLong { len, max: MAX_REQUIREMENTS_CHARS });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use storymap_core::{InMemoryCache, Language, StoryMapError};
    use storymap_model::{MockProvider, Outcome};

    const MAP_JSON: &str = r#"{
        "productName": "Notes",
        "personas": ["Writer"],
        "map": [{"activity": "Write", "tasks": [{"taskTitle": "Edit", "stories": [
            {"title": "Create a note", "description": "As a writer I can start a new note",
             "priority": "MVP", "acceptanceCriteria": ["A blank note opens", "Cursor is in the body"]}
        ]}]}]
    }"#;

    const REQUIREMENTS: &str = "A note-taking app with folders and search";

    fn generator(mock: &Arc<MockProvider>) -> MapGenerator {
        let registry = OrchestratorRegistry::new().with_provider(mock.clone()).with_priority(["mock"]);
        MapGenerator::new(Arc::new(registry))
    }

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(StoryMapError::Cache("connection refused".to_string()))
        }

        async fn set_with_ttl(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
            Err(StoryMapError::Cache("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generate_parses_fenced_response() {
        let mock = Arc::new(MockProvider::new("mock").with_response(format!("```json\n{MAP_JSON}\n```")));
        let generated = generator(&mock).generate(REQUIREMENTS, None).await.unwrap();

        assert_eq!(generated.map.product_name, "Notes");
        assert_eq!(generated.map.story_count(), 1);
        assert_eq!(generated.provider.as_deref(), Some("mock"));
        assert!(!generated.from_cache);

        let request = &mock.requests()[0];
        assert_eq!(request.body["task"], "generation");
        assert!(request.body["user"].as_str().unwrap().contains(REQUIREMENTS));
        assert_eq!(request.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_second_generate_is_served_from_cache() {
        let mock = Arc::new(MockProvider::new("mock").with_response(MAP_JSON));
        let generator = generator(&mock);
        let cache = InMemoryCache::new();

        let first = generator.generate(REQUIREMENTS, Some(&cache)).await.unwrap();
        let second = generator.generate(REQUIREMENTS, Some(&cache)).await.unwrap();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(first.map, second.map);
        assert!(second.from_cache);
        assert_eq!(second.provider, None);
    }

    #[test]
    fn test_cache_key_depends_on_language() {
        let mock = Arc::new(MockProvider::new("mock").with_response(MAP_JSON));
        let english = generator(&mock);
        let russian = generator(&mock).with_config(GenerationConfig::default().with_language(Language::Russian)).unwrap();
        assert_ne!(english.cache_key(REQUIREMENTS), russian.cache_key(REQUIREMENTS));
        assert_eq!(english.cache_key(REQUIREMENTS), english.cache_key(REQUIREMENTS));
    }

    #[test]
    fn test_with_config_rejects_invalid_settings() {
        let mock = Arc::new(MockProvider::new("mock"));

        let err = generator(&mock).with_config(GenerationConfig::default().with_temperature(-0.1)).err().unwrap();
        assert_eq!(err.field, "temperature");

        let err = generator(&mock).with_config(GenerationConfig::default().with_cache_prefix("  ")).err().unwrap();
        assert_eq!(err.field, "cache_prefix");
    }

    #[tokio::test]
    async fn test_broken_cache_falls_through() {
        let mock = Arc::new(MockProvider::new("mock").with_response(MAP_JSON));
        let generator = generator(&mock);

        let generated = generator.generate(REQUIREMENTS, Some(&BrokenCache)).await.unwrap();
        assert_eq!(generated.map.product_name, "Notes");
        generator.generate(REQUIREMENTS, Some(&BrokenCache)).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_input_length_is_checked_before_any_call() {
        let mock = Arc::new(MockProvider::new("mock").with_response(MAP_JSON));
        let generator = generator(&mock);

        let err = generator.generate("   too short   ", None).await.unwrap_err();
        assert!(matches!(err, StoryMapError::InvalidInput(InputError::TooShort { len: 9, min: 10 })));

        let long = "x".repeat(MAX_REQUIREMENTS_CHARS + 1);
        let err = generator.generate(&long, None).await.unwrap_err();
        assert!(matches!(err, StoryMapError::InvalidInput(InputError::TooLong { len: 10_001, .. })));

        let exact = "é".repeat(MAX_REQUIREMENTS_CHARS);
        assert!(generator.generate(&exact, None).await.is_ok());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_malformed_responses() {
        let mock = Arc::new(MockProvider::new("mock").with_response("").with_response("{\"productName\": 1}"));
        let generator = generator(&mock);
        let cache = InMemoryCache::new();

        let err = generator.generate(REQUIREMENTS, Some(&cache)).await.unwrap_err();
        assert!(matches!(err, StoryMapError::EmptyResponse));

        let err = generator.generate(REQUIREMENTS, Some(&cache)).await.unwrap_err();
        assert!(matches!(err, StoryMapError::MalformedResponse(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_provider_error_propagates() {
        let mock = Arc::new(MockProvider::new("mock").with_outcome(Outcome::Fatal("400 bad request".to_string())));
        let err = generator(&mock).generate(REQUIREMENTS, None).await.unwrap_err();
        assert!(matches!(err, StoryMapError::Provider { ref provider, .. } if provider == "mock"));
    }
}
