//! # storymap-model
//!
//! Uniform access to the LLM backends that generate story maps.
//!
//! ## Overview
//!
//! - [`Provider`] - strategy trait each backend implements
//! - [`Outcome`] - `Success | Retryable | Fatal` result of one provider call
//! - [`RateTracker`] - per-provider daily request counters
//! - [`OrchestratorRegistry`] - ordered fallback across providers
//! - [`ProvidersConfig`] - environment / TOML configuration
//!
//! ## Providers
//!
//! | Provider | Type | JSON output |
//! |----------|------|-------------|
//! | Gemini | [`GeminiProvider`] | native (`responseMimeType`) |
//! | OpenAI | [`OpenAICompatibleProvider::openai`] | native (`response_format`) |
//! | Groq | [`OpenAICompatibleProvider::groq`] | native (`response_format`) |
//! | Perplexity | [`OpenAICompatibleProvider::perplexity`] | appended instruction |
//!
//! ## Example
//!
//! ```rust,ignore
//! use storymap_model::{ChatRequest, OrchestratorRegistry, ProvidersConfig, TaskType};
//!
//! let registry = OrchestratorRegistry::from_config(&ProvidersConfig::from_env()?)?;
//! let response = registry
//!     .send_default(&ChatRequest::new("You are an analyst", "Build a map"), TaskType::Generation)
//!     .await?;
//! println!("{} answered", response.provider);
//! ```

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai_compatible;
pub mod orchestrator;
pub mod outcome;
pub mod provider;
pub mod rate_tracker;
pub mod request;
pub mod retry;

pub use config::{ConfigError, ProviderKind, ProviderSpec, ProvidersConfig, TaskModels};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use openai_compatible::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use orchestrator::{OrchestratorRegistry, ProviderResponse};
pub use outcome::Outcome;
pub use provider::{JSON_ONLY_INSTRUCTION, Provider, ProviderRequest};
pub use rate_tracker::{Clock, FixedClock, ModelQuota, RateTracker, SystemClock};
pub use request::{ChatRequest, TaskType};
