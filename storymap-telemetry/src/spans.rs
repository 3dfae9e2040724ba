//! Span helpers for pipeline stages
//!
//! Field names follow the `<area>.<attribute>` convention so that spans can be
//! exported to any tracing backend without renaming.

use tracing::Span;

/// Span covering one agent run from generation to final validation.
///
/// # Example
/// ```
/// use storymap_telemetry::agent_run_span;
/// let span = agent_run_span("5f0c…");
/// let _enter = span.enter();
/// ```
pub fn agent_run_span(run_id: &str) -> Span {
    tracing::info_span!("storymap.agent_run", run.id = run_id, otel.kind = "internal")
}

/// Span for map generation through the provider chain.
pub fn generation_span(input_len: usize) -> Span {
    tracing::info_span!(
        "storymap.generate",
        input.len = input_len,
        cache.hit = tracing::field::Empty,
        otel.kind = "internal"
    )
}

/// Span for a single provider call.
///
/// # Example
/// ```
/// use storymap_telemetry::provider_call_span;
/// let span = provider_call_span("groq", "llama-3.3-70b-versatile");
/// let _enter = span.enter();
/// ```
pub fn provider_call_span(provider: &str, model: &str) -> Span {
    tracing::info_span!(
        "provider.call",
        provider.name = provider,
        model.name = model,
        otel.kind = "client"
    )
}

pub fn validation_span(story_count: usize) -> Span {
    tracing::debug_span!("storymap.validate", map.stories = story_count)
}

pub fn similarity_span(story_count: usize) -> Span {
    tracing::debug_span!("storymap.similarity", map.stories = story_count)
}

pub fn fix_span(critical_issues: usize, duplicate_groups: usize) -> Span {
    tracing::info_span!(
        "storymap.fix",
        issues.critical = critical_issues,
        groups.duplicate = duplicate_groups,
        otel.kind = "internal"
    )
}

/// Record whether the current generation was served from cache.
pub fn record_cache_hit(hit: bool) {
    Span::current().record("cache.hit", hit);
}
