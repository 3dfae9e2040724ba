//! Assistant-task rewrites of a single story.

use crate::response::parse_response;
use crate::{cached, prompt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storymap_core::{Cache, InputError, Language, Priority, Result, Story, cache_key};
use storymap_model::{ChatRequest, OrchestratorRegistry, TaskType};
use storymap_telemetry::info;

pub const MIN_PROMPT_CHARS: usize = 3;
pub const MAX_PROMPT_CHARS: usize = 1000;

const IMPROVE_TEMPERATURE: f32 = 0.7;
const IMPROVE_TIMEOUT: Duration = Duration::from_secs(30);
const IMPROVE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Canned improvement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImproveAction {
    Details,
    Criteria,
    Split,
    EdgeCases,
}

impl ImproveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImproveAction::Details => "details",
            ImproveAction::Criteria => "criteria",
            ImproveAction::Split => "split",
            ImproveAction::EdgeCases => "edge_cases",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            ImproveAction::Details => {
                "Add more detail and specifics to the story description. Expand on the usage context."
            }
            ImproveAction::Criteria => {
                "Improve and extend the acceptance criteria. Make them more specific, measurable and complete."
            }
            ImproveAction::Split => {
                "Analyze the story and propose how to split it into 2-3 smaller, independent stories."
            }
            ImproveAction::EdgeCases => {
                "Add edge cases to the acceptance criteria. Consider errors, extreme situations and offline mode."
            }
        }
    }
}

/// Model answer to an improvement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum StoryImprovement {
    Improve {
        title: String,
        description: String,
        priority: Priority,
        #[serde(rename = "acceptanceCriteria", alias = "acceptance_criteria", default)]
        acceptance_criteria: Vec<String>,
        #[serde(default)]
        suggestion: String,
    },
    Split {
        stories: Vec<Story>,
        #[serde(default)]
        suggestion: String,
    },
}

impl StoryImprovement {
    /// Resulting stories: one for an improvement, several for a split.
    pub fn into_stories(self) -> Vec<Story> {
        match self {
            StoryImprovement::Improve { title, description, priority, acceptance_criteria, .. } => {
                vec![Story::new(title, description, priority).with_criteria(acceptance_criteria)]
            }
            StoryImprovement::Split { stories, .. } => stories,
        }
    }

    pub fn suggestion(&self) -> &str {
        match self {
            StoryImprovement::Improve { suggestion, .. } | StoryImprovement::Split { suggestion, .. } => suggestion,
        }
    }
}

pub struct StoryImprover {
    registry: Arc<OrchestratorRegistry>,
    language: Language,
    cache_prefix: String,
}

impl StoryImprover {
    pub fn new(registry: Arc<OrchestratorRegistry>) -> Self {
        Self { registry, language: Language::default(), cache_prefix: crate::config::DEFAULT_CACHE_PREFIX.to_string() }
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Ask the assistant model to rework `story` according to `request`.
    pub async fn improve_story(
        &self,
        story: &Story,
        request: &str,
        action: Option<ImproveAction>,
        cache: Option<&dyn Cache>,
    ) -> Result<StoryImprovement> {
        check_prompt(request)?;

        let action_name = action.map_or("", |a| a.as_str());
        let key = cache_key(
            &self.cache_prefix,
            &["improve", self.language.code(), &story.title, request, action_name],
        );
        if let Some(cache) = cache {
            if let Some(improvement) = cached::read(cache, &key).await {
                info!(story = %story.title, "Using cached story improvement");
                return Ok(improvement);
            }
        }

        info!(prompt_len = request.chars().count(), action = action_name, "Improving story");
        let chat = ChatRequest::new(
            prompt::improve_system(self.language),
            prompt::improve_user(story, request, action.map(|a| a.instruction())),
        )
        .with_temperature(IMPROVE_TEMPERATURE)
        .with_timeout(IMPROVE_TIMEOUT);

        let response = self.registry.send_default(&chat, TaskType::Assistant).await?;
        let improvement: StoryImprovement = parse_response(&response.text)?;

        if let Some(cache) = cache {
            cached::write(cache, &key, &improvement, IMPROVE_CACHE_TTL).await;
        }
        Ok(improvement)
    }
}

fn check_prompt(request: &str) -> std::result::Result<(), InputError> {
    let trimmed = request.trim().chars().count();
    if trimmed < MIN_PROMPT_CHARS {
        return Err(InputError::PromptTooShort { len: trimmed, min: MIN_PROMPT_CHARS });
    }
    let len = request.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(InputError::PromptTooLong { len, max: MAX_PROMPT_CHARS });
    }
    Ok(())
}
