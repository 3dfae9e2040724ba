//! Provider configuration.
//!
//! Configuration is loaded once at start-up, either from environment
//! variables with [`ProvidersConfig::from_env`] or from TOML with
//! [`ProvidersConfig::from_toml_str`], and validated before any provider is
//! built.
//!
//! ## Environment variables
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `AI_PROVIDER_PRIORITY` | comma-separated fallback order (default `gemini,groq,perplexity,openai`) |
//! | `<P>_API_KEY` | credential; a provider without one is registered but unavailable |
//! | `<P>_BASE_URL` | endpoint override |
//! | `<P>_{ENHANCEMENT,GENERATION,ASSISTANT}_MODEL` | per-task model override |
//! | `GEMINI_FLASH_LIMIT` / `GEMINI_PRO_LIMIT` | Gemini requests per day |
//!
//! `<P>` is `GEMINI`, `GROQ`, `PERPLEXITY` or `OPENAI`.

use crate::gemini::{DEFAULT_FLASH_LIMIT, DEFAULT_PRO_LIMIT, GEMINI_API_BASE, GeminiConfig, GeminiProvider};
use crate::openai_compatible::{
    GROQ_API_BASE, OPENAI_API_BASE, OpenAICompatibleConfig, OpenAICompatibleProvider, PERPLEXITY_API_BASE,
};
use crate::rate_tracker::ModelQuota;
use crate::{Provider, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use storymap_core::{Result, StoryMapError};

pub const DEFAULT_PRIORITY: &[&str] = &["gemini", "groq", "perplexity", "openai"];

/// Configuration error with context and suggestions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "{field}: {message}{hint}",
    hint = .suggestion.as_deref().map(|s| format!(". {s}")).unwrap_or_default()
)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the error
    pub message: String,
    /// Suggested fix or valid values
    pub suggestion: Option<String>,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl From<ConfigError> for StoryMapError {
    fn from(error: ConfigError) -> Self {
        StoryMapError::Config(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Groq,
    Perplexity,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] =
        [ProviderKind::Gemini, ProviderKind::Groq, ProviderKind::Perplexity, ProviderKind::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Groq => "groq",
            ProviderKind::Perplexity => "perplexity",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI",
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Groq => "GROQ",
            ProviderKind::Perplexity => "PERPLEXITY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_API_BASE,
            ProviderKind::OpenAi => OPENAI_API_BASE,
            ProviderKind::Groq => GROQ_API_BASE,
            ProviderKind::Perplexity => PERPLEXITY_API_BASE,
        }
    }

    pub fn default_models(&self) -> TaskModels {
        match self {
            ProviderKind::Gemini => TaskModels {
                enhancement: "gemini-2.0-flash".to_string(),
                generation: "gemini-2.5-pro".to_string(),
                assistant: "gemini-2.0-flash".to_string(),
            },
            ProviderKind::OpenAi => TaskModels::uniform("gpt-4o"),
            ProviderKind::Groq => TaskModels::uniform("llama-3.3-70b-versatile"),
            ProviderKind::Perplexity => TaskModels::uniform("sonar"),
        }
    }

    /// Whether the provider has a native structured-JSON output mode.
    pub fn supports_native_json(&self) -> bool {
        !matches!(self, ProviderKind::Perplexity)
    }
}

/// Model selected for each task type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskModels {
    pub enhancement: String,
    pub generation: String,
    pub assistant: String,
}

impl TaskModels {
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self { enhancement: model.clone(), generation: model.clone(), assistant: model }
    }

    pub fn get(&self, task: TaskType) -> &str {
        match task {
            TaskType::Enhancement => &self.enhancement,
            TaskType::Generation => &self.generation,
            TaskType::Assistant => &self.assistant,
        }
    }
}

/// One configured provider. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<TaskModels>,
    #[serde(default)]
    pub daily_limits: Vec<ModelQuota>,
}

impl ProviderSpec {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            api_key: api_key.into(),
            base_url: None,
            models: None,
            daily_limits: Vec::new(),
        }
    }

    pub fn models(&self) -> TaskModels {
        self.models.clone().unwrap_or_else(|| self.kind.default_models())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.kind.default_base_url())
    }

    /// Construct the concrete provider for this entry.
    pub fn build(&self) -> Result<Arc<dyn Provider>> {
        let provider: Arc<dyn Provider> = match self.kind {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                GeminiConfig::new(self.api_key.clone())
                    .with_provider_name(self.name.clone())
                    .with_base_url(self.base_url())
                    .with_models(self.models()),
            )?),
            kind => Arc::new(OpenAICompatibleProvider::new(OpenAICompatibleConfig {
                provider_name: self.name.clone(),
                api_key: self.api_key.clone(),
                base_url: self.base_url().to_string(),
                models: self.models(),
                native_json: kind.supports_native_json(),
            })?),
        };
        Ok(provider)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub priority: Vec<String>,
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,
}

impl ProvidersConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let priority = match get("AI_PROVIDER_PRIORITY") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect(),
        };

        let mut providers = Vec::with_capacity(ProviderKind::ALL.len());
        for kind in ProviderKind::ALL {
            let prefix = kind.env_prefix();
            let mut spec = ProviderSpec::new(kind, get(&format!("{prefix}_API_KEY")).unwrap_or_default());
            spec.base_url = get(&format!("{prefix}_BASE_URL"));

            let defaults = kind.default_models();
            spec.models = Some(TaskModels {
                enhancement: get(&format!("{prefix}_ENHANCEMENT_MODEL")).unwrap_or(defaults.enhancement),
                generation: get(&format!("{prefix}_GENERATION_MODEL")).unwrap_or(defaults.generation),
                assistant: get(&format!("{prefix}_ASSISTANT_MODEL")).unwrap_or(defaults.assistant),
            });

            if kind == ProviderKind::Gemini {
                let flash = parse_limit("GEMINI_FLASH_LIMIT", get("GEMINI_FLASH_LIMIT"), DEFAULT_FLASH_LIMIT)?;
                let pro = parse_limit("GEMINI_PRO_LIMIT", get("GEMINI_PRO_LIMIT"), DEFAULT_PRO_LIMIT)?;
                spec.daily_limits = vec![ModelQuota::new("flash", flash), ModelQuota::new("pro", pro)];
            }
            providers.push(spec);
        }

        let config = Self { priority, providers };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| ConfigError::new("config", format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Names of providers that have credentials.
    pub fn available_providers(&self) -> Vec<&str> {
        self.providers.iter().filter(|p| !p.api_key.is_empty()).map(|p| p.name.as_str()).collect()
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.priority.is_empty() {
            return Err(ConfigError::new("priority", "Provider priority list cannot be empty")
                .with_suggestion(format!("Set AI_PROVIDER_PRIORITY, e.g. {}", DEFAULT_PRIORITY.join(","))));
        }

        let mut names = HashSet::new();
        for spec in &self.providers {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::new("providers.name", "Provider name cannot be empty"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::new(
                    "providers.name",
                    format!("Provider '{}' is configured more than once", spec.name),
                ));
            }
            let models = spec.models();
            for task in [TaskType::Enhancement, TaskType::Generation, TaskType::Assistant] {
                if models.get(task).trim().is_empty() {
                    return Err(ConfigError::new(
                        format!("providers.{}.models.{task}", spec.name),
                        "Model name cannot be empty",
                    ));
                }
            }
            if spec.daily_limits.iter().any(|q| q.model_pattern.trim().is_empty()) {
                return Err(ConfigError::new(
                    format!("providers.{}.daily_limits", spec.name),
                    "Quota model pattern cannot be empty",
                )
                .with_suggestion("Use a model family substring such as 'flash' or 'pro'"));
            }
        }

        let mut seen = HashSet::new();
        for name in &self.priority {
            if !names.contains(name.as_str()) {
                return Err(ConfigError::new("priority", format!("Unknown provider '{name}' in priority list"))
                    .with_suggestion(format!("Configured providers: {:?}", names.iter().collect::<Vec<_>>())));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::new("priority", format!("Provider '{name}' is listed more than once")));
            }
        }

        Ok(())
    }
}

fn parse_limit(field: &str, raw: Option<String>, default: u32) -> std::result::Result<u32, ConfigError> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| {
            ConfigError::new(field, format!("Invalid daily limit '{raw}'"))
                .with_suggestion("Use a non-negative integer number of requests per day")
        }),
        None => Ok(default),
    }
}
