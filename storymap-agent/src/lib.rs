//! # storymap-agent
//!
//! Turns free-text product requirements into a validated story map.
//!
//! ## Overview
//!
//! - [`MapGenerator`] - prompt, provider call, fence stripping, strict parsing and caching
//! - [`StoryMapAgent`] - generate → validate → at most one fix → revalidate, with [`AgentRun`] metrics
//! - [`StoryImprover`] - assistant rewrites and splits of a single story
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storymap_agent::StoryMapAgent;
//! use storymap_core::InMemoryCache;
//! use storymap_model::{OrchestratorRegistry, ProvidersConfig};
//!
//! storymap_telemetry::init_telemetry("storymap")?;
//!
//! let registry = Arc::new(OrchestratorRegistry::from_config(&ProvidersConfig::from_env()?)?);
//! let agent = StoryMapAgent::new(registry).with_cache(Arc::new(InMemoryCache::new()));
//!
//! let output = agent.run("Online bookstore: users search, add to cart, checkout").await?;
//! if let Some(validation) = &output.validation {
//!     println!("score {}", validation.validation.score);
//! }
//! ```

pub mod agent;
mod cached;
pub mod config;
pub mod generator;
pub mod improve;
mod prompt;
pub mod response;

pub use agent::{AgentOutput, AgentRun, AgentValidation, StageTimings, StoryMapAgent};
pub use config::{AgentConfig, GenerationConfig};
pub use generator::{GeneratedMap, MAX_REQUIREMENTS_CHARS, MIN_REQUIREMENTS_CHARS, MapGenerator};
pub use improve::{ImproveAction, StoryImprovement, StoryImprover};
pub use response::{parse_response, strip_code_fences};
