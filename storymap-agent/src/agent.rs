//! Generate → validate → (one) fix → revalidate.

use crate::config::{AgentConfig, GenerationConfig};
use crate::generator::MapGenerator;
use crate::prompt;
use crate::response::parse_response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storymap_core::{Cache, Result, StoryMap};
use storymap_model::{ChatRequest, ConfigError, OrchestratorRegistry, TaskType};
use storymap_quality::{SimilarityDetector, SimilarityResult, ValidationResult, validate};
use storymap_telemetry::{agent_run_span, debug, fix_span, info, warn};
use tracing::Instrument;
use uuid::Uuid;

/// Quality gate results for one version of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentValidation {
    pub validation: ValidationResult,
    /// `None` when the map has fewer than two stories.
    pub similarity: Option<SimilarityResult>,
}

impl AgentValidation {
    pub fn critical_count(&self) -> usize {
        self.validation.critical_issues().count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.similarity.as_ref().map_or(0, |s| s.stats.duplicates_found)
    }

    pub fn similar_group_count(&self) -> usize {
        self.similarity.as_ref().map_or(0, |s| s.stats.similar_groups_found)
    }

    fn needs_fix(&self) -> bool {
        self.critical_count() > 0 || self.duplicate_count() > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub generation: Duration,
    pub validation: Duration,
    pub fix: Duration,
    pub total: Duration,
}

/// Metrics for a single [`StoryMapAgent::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub timings: StageTimings,
    /// Provider that produced the initial map; `None` on a cache hit.
    pub provider_used: Option<String>,
    pub from_cache: bool,
    pub fix_attempted: bool,
    pub fix_successful: bool,
    /// Provider that answered the fix request with a parseable map.
    pub fix_provider: Option<String>,
    pub critical_issues_before_fix: usize,
    pub critical_issues_after_fix: usize,
    /// Counts for the final map.
    pub similar_groups_found: usize,
    pub duplicates_found: usize,
}

impl AgentRun {
    fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            timings: StageTimings::default(),
            provider_used: None,
            from_cache: false,
            fix_attempted: false,
            fix_successful: false,
            fix_provider: None,
            critical_issues_before_fix: 0,
            critical_issues_after_fix: 0,
            similar_groups_found: 0,
            duplicates_found: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutput {
    pub map: StoryMap,
    /// Validation of the final map; `None` when validation is disabled.
    pub validation: Option<AgentValidation>,
    pub run: AgentRun,
}

/// Runs the generation pipeline with a bounded, single repair pass.
///
/// ```rust,ignore
/// let registry = Arc::new(OrchestratorRegistry::from_config(&ProvidersConfig::from_env()?)?);
/// let agent = StoryMapAgent::new(registry).with_cache(Arc::new(InMemoryCache::new()));
/// let output = agent.run("Online bookstore: search, cart, checkout").await?;
/// println!("fix attempted: {}", output.run.fix_attempted);
/// ```
pub struct StoryMapAgent {
    generator: MapGenerator,
    config: AgentConfig,
    detector: SimilarityDetector,
    cache: Option<Arc<dyn Cache>>,
}

impl StoryMapAgent {
    pub fn new(registry: Arc<OrchestratorRegistry>) -> Self {
        Self {
            generator: MapGenerator::new(registry),
            config: AgentConfig::default(),
            detector: SimilarityDetector::default(),
            cache: None,
        }
    }

    /// Replace the stage settings after checking them.
    pub fn with_config(mut self, config: AgentConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Also selects the stop words the similarity check uses.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> std::result::Result<Self, ConfigError> {
        let language = config.language;
        self.generator = self.generator.with_config(config)?;
        self.detector = SimilarityDetector::for_language(language);
        Ok(self)
    }

    #[must_use]
    pub fn with_detector(mut self, detector: SimilarityDetector) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn generator(&self) -> &MapGenerator {
        &self.generator
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Generate a map for `requirements` and run the quality loop over it.
    ///
    /// Only generation errors are returned. A failed fix, or a fixed map with
    /// more critical issues than before, keeps the generated map.
    pub async fn run(&self, requirements: &str) -> Result<AgentOutput> {
        let run = AgentRun::start();
        let span = agent_run_span(&run.run_id.to_string());
        self.run_stages(requirements, run).instrument(span).await
    }

    async fn run_stages(&self, requirements: &str, mut run: AgentRun) -> Result<AgentOutput> {
        let started = Instant::now();
        info!("Starting story map generation");

        let cache = if self.config.use_cache { self.cache.as_deref() } else { None };
        let generated = self.generator.generate(requirements, cache).await?;
        run.timings.generation = started.elapsed();
        run.provider_used = generated.provider;
        run.from_cache = generated.from_cache;
        let mut map = generated.map;

        if !self.config.enable_validation {
            run.timings.total = started.elapsed();
            info!(total_ms = run.timings.total.as_millis() as u64, "Generation completed without validation");
            return Ok(AgentOutput { map, validation: None, run });
        }

        let validation_started = Instant::now();
        let mut assessment = self.assess(&map);
        run.timings.validation = validation_started.elapsed();

        let critical_before = assessment.critical_count();
        let duplicates_before = assessment.duplicate_count();
        run.critical_issues_before_fix = critical_before;
        run.critical_issues_after_fix = critical_before;

        if self.config.enable_fix && assessment.needs_fix() {
            info!(critical = critical_before, duplicates = duplicates_before, "Attempting a fix pass");
            run.fix_attempted = true;
            let fix_started = Instant::now();

            let span = fix_span(critical_before, duplicates_before);
            let fixed = match self.fix(&map, &assessment).instrument(span).await {
                Ok(fixed) => Some(fixed),
                Err(e) => {
                    warn!(error = %e, "Fix attempt failed, keeping the generated map");
                    None
                }
            };
            run.timings.fix = fix_started.elapsed();

            if let Some((fixed, provider)) = fixed {
                let revalidation_started = Instant::now();
                let candidate = self.assess(&fixed);
                run.timings.validation += revalidation_started.elapsed();

                if candidate.critical_count() > critical_before {
                    warn!(
                        before = critical_before,
                        after = candidate.critical_count(),
                        "Fixed map has more critical issues, keeping the generated map"
                    );
                } else {
                    info!(provider = %provider, "Map fixed");
                    map = fixed;
                    assessment = candidate;
                }
                run.fix_provider = Some(provider);
            }

            let critical_after = assessment.critical_count();
            run.critical_issues_after_fix = critical_after;
            run.fix_successful = if critical_before > 0 {
                critical_after < critical_before
            } else {
                critical_after == 0 && assessment.duplicate_count() < duplicates_before
            };
        } else {
            debug!("No fixes needed");
        }

        run.similar_groups_found = assessment.similar_group_count();
        run.duplicates_found = assessment.duplicate_count();
        run.timings.total = started.elapsed();
        info!(
            total_ms = run.timings.total.as_millis() as u64,
            score = assessment.validation.score,
            fix_attempted = run.fix_attempted,
            fix_successful = run.fix_successful,
            "Generation completed"
        );

        Ok(AgentOutput { map, validation: Some(assessment), run })
    }

    fn assess(&self, map: &StoryMap) -> AgentValidation {
        let validation = validate(map);
        let similarity = (map.story_count() >= 2).then(|| {
            let thresholds = self.config.thresholds();
            self.detector.analyze(map, thresholds.similarity(), thresholds.duplicate())
        });
        AgentValidation { validation, similarity }
    }

    async fn fix(&self, map: &StoryMap, assessment: &AgentValidation) -> Result<(StoryMap, String)> {
        let language = self.generator.config().language;
        let map_json = serde_json::to_string_pretty(map)?;
        let duplicates = assessment.similarity.iter().flat_map(|s| s.duplicate_groups());
        let user = prompt::fix_user(&map_json, assessment.validation.critical_issues(), duplicates, language);

        let request = ChatRequest::new(prompt::fix_system(language), user)
            .with_temperature(self.config.fix_temperature)
            .with_timeout(self.config.fix_timeout);
        let response = self.generator.registry().send_default(&request, TaskType::Generation).await?;
        let fixed = parse_response(&response.text)?;
        Ok((fixed, response.provider))
    }
}
