//! Ordered fallback across providers.

use crate::config::ProvidersConfig;
use crate::{ChatRequest, Outcome, Provider, RateTracker, TaskType};
use std::collections::HashMap;
use std::sync::Arc;
use storymap_core::{Result, StoryMapError};
use storymap_telemetry::{debug, info, provider_call_span, warn};
use tracing::Instrument;

/// Normalized result of a successful [`OrchestratorRegistry::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

/// Providers, their shared rate tracker and the default fallback order.
///
/// Built once at start-up and shared (usually behind an `Arc`) with every
/// pipeline component that needs to call a model.
pub struct OrchestratorRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    rate_tracker: Arc<RateTracker>,
    default_priority: Vec<String>,
}

impl Default for OrchestratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            rate_tracker: Arc::new(RateTracker::new()),
            default_priority: Vec::new(),
        }
    }

    /// Build every configured provider and register their quotas.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        config.validate().map_err(|e| StoryMapError::Config(e.to_string()))?;

        let mut tracker = RateTracker::new();
        let mut registry = Self::new().with_priority(config.priority.clone());
        for spec in &config.providers {
            if !spec.daily_limits.is_empty() {
                tracker = tracker.with_quotas(spec.name.clone(), spec.daily_limits.clone());
            }
            registry = registry.with_provider(spec.build()?);
        }
        Ok(registry.with_rate_tracker(Arc::new(tracker)))
    }

    /// Register a provider under its [`Provider::name`]; replaces any previous one.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    #[must_use]
    pub fn with_rate_tracker(mut self, rate_tracker: Arc<RateTracker>) -> Self {
        self.rate_tracker = rate_tracker;
        self
    }

    #[must_use]
    pub fn with_priority<I, S>(mut self, priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_priority = priority.into_iter().map(Into::into).collect();
        self
    }

    pub fn rate_tracker(&self) -> &Arc<RateTracker> {
        &self.rate_tracker
    }

    pub fn default_priority(&self) -> &[String] {
        &self.default_priority
    }

    pub fn provider(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(name)
    }

    /// [`send`](Self::send) using the registry's default priority.
    pub async fn send_default(&self, request: &ChatRequest, task: TaskType) -> Result<ProviderResponse> {
        self.send(request, &self.default_priority, task).await
    }

    /// Try providers in `priority` order until one succeeds.
    ///
    /// Unregistered, unavailable and rate-limited providers are skipped
    /// without a call. A retryable failure moves on to the next provider; a
    /// fatal one is returned immediately as [`StoryMapError::Provider`].
    pub async fn send(
        &self,
        request: &ChatRequest,
        priority: &[String],
        task: TaskType,
    ) -> Result<ProviderResponse> {
        if priority.is_empty() {
            return Err(StoryMapError::NoProviderConfigured);
        }

        let mut last_error: Option<String> = None;
        let mut last_provider: Option<String> = None;

        for name in priority {
            let Some(provider) = self.providers.get(name) else {
                debug!(provider = %name, "Skipping unregistered provider");
                continue;
            };
            if !provider.is_available() {
                debug!(provider = %name, "Skipping provider that is not initialized");
                continue;
            }

            let model = provider.model_for(task).to_string();
            if self.rate_tracker.should_skip(name, &model) {
                info!(
                    provider = %name,
                    model = %model,
                    count = self.rate_tracker.count(name, &model),
                    "Skipping provider at daily limit"
                );
                continue;
            }

            let provider_request = provider.build_request(request, task);
            let timeout = provider_request.timeout;
            let outcome = match tokio::time::timeout(timeout, provider.call(provider_request))
                .instrument(provider_call_span(name, &model))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Outcome::Retryable(format!("request timed out after {timeout:?}")),
            };

            match outcome {
                Outcome::Success(text) => {
                    self.rate_tracker.increment(name, &model);
                    info!(provider = %name, model = %model, task = %task, "Provider call succeeded");
                    return Ok(ProviderResponse { text, provider: name.clone(), model });
                }
                Outcome::Retryable(error) => {
                    warn!(provider = %name, model = %model, error = %error, "Provider failed, trying next");
                    last_error = Some(error);
                    last_provider = Some(name.clone());
                }
                Outcome::Fatal(error) => {
                    warn!(provider = %name, model = %model, error = %error, "Provider failed with non-retryable error");
                    return Err(StoryMapError::Provider { provider: name.clone(), message: error });
                }
            }
        }

        Err(StoryMapError::AllProvidersFailed {
            last_error: last_error.unwrap_or_else(|| "no provider was available to handle the request".to_string()),
            last_provider,
        })
    }
}
