//! Human-readable summaries and the combined quality score.

use crate::similarity::{SimilarityDetector, SimilarityResult, SimilarityThresholds};
use crate::validation::{IssueSeverity, ValidationResult, validate};
use serde::Serialize;
use storymap_core::StoryMap;

const VALIDATION_WEIGHT: f64 = 0.7;
const SIMILARITY_WEIGHT: f64 = 0.3;
const DUPLICATE_PENALTY: usize = 10;
const MAX_DUPLICATE_PENALTY: usize = 30;

/// Validation and similarity results for one map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullAnalysis {
    pub validation: ValidationResult,
    pub similarity: SimilarityResult,
    pub overall_score: u8,
    pub summary: String,
}

/// Run both quality gates over `map` and combine them.
pub fn full_analysis(map: &StoryMap, thresholds: SimilarityThresholds) -> FullAnalysis {
    let validation = validate(map);
    let similarity = SimilarityDetector::default().analyze(map, thresholds.similarity(), thresholds.duplicate());
    let overall_score = overall_score(&validation, &similarity);
    let summary = analysis_summary(&map.product_name, &validation, &similarity, overall_score);
    FullAnalysis { validation, similarity, overall_score, summary }
}

/// 70% validation score, 30% similarity score. The similarity part loses 10
/// points per duplicate group, at most 30.
///
/// ```rust
/// use storymap_core::StoryMap;
/// use storymap_quality::{analyze, overall_score, validate};
///
/// let map = StoryMap::new("Empty");
/// let score = overall_score(&validate(&map), &analyze(&map, 0.7, 0.9));
/// assert!(score <= 100);
/// ```
pub fn overall_score(validation: &ValidationResult, similarity: &SimilarityResult) -> u8 {
    let penalty = (similarity.stats.duplicates_found * DUPLICATE_PENALTY).min(MAX_DUPLICATE_PENALTY);
    let similarity_score = (100 - penalty) as f64;
    let overall = f64::from(validation.score) * VALIDATION_WEIGHT + similarity_score * SIMILARITY_WEIGHT;
    overall.clamp(0.0, 100.0) as u8
}

fn quality_label(score: u8) -> &'static str {
    match score {
        90.. => "excellent",
        70..=89 => "good",
        50..=69 => "fair",
        _ => "needs improvement",
    }
}

pub fn validation_summary(result: &ValidationResult) -> String {
    let mut parts = vec![format!(
        "Validation score {}/100 ({}).",
        result.score,
        quality_label(result.score)
    )];
    parts.push(format!("Stories: {}.", result.stats.total_stories));

    let errors = result.count(IssueSeverity::Error);
    let warnings = result.count(IssueSeverity::Warning);
    if errors == 0 && warnings == 0 {
        parts.push("No problems found.".to_string());
    } else {
        if errors > 0 {
            parts.push(format!("Critical issues: {errors}."));
        }
        if warnings > 0 {
            parts.push(format!("Warnings: {warnings}."));
        }
    }
    parts.join(" ")
}

pub fn similarity_summary(result: &SimilarityResult) -> String {
    let stats = &result.stats;
    if stats.similar_groups_found == 0 {
        return format!("Analyzed {} stories: no duplicates or similar stories found.", stats.total_stories);
    }

    let mut parts = vec![format!("Analyzed {} stories:", stats.total_stories)];
    let similar_only = stats.similar_groups_found - stats.duplicates_found;
    if stats.duplicates_found > 0 {
        parts.push(format!("{} group(s) of possible duplicates", stats.duplicates_found));
    }
    if similar_only > 0 {
        if stats.duplicates_found > 0 {
            parts.push("and".to_string());
        }
        parts.push(format!("{similar_only} group(s) of similar stories"));
    }
    format!("{}.", parts.join(" "))
}

fn analysis_summary(
    product_name: &str,
    validation: &ValidationResult,
    similarity: &SimilarityResult,
    overall_score: u8,
) -> String {
    let mut parts = vec![format!(
        "Project '{product_name}': {} quality ({overall_score}/100).",
        quality_label(overall_score)
    )];
    parts.push(format!("Total stories: {}.", validation.stats.total_stories));

    let errors = validation.count(IssueSeverity::Error);
    if errors > 0 {
        parts.push(format!("Critical issues: {errors}."));
    }
    let warnings = validation.count(IssueSeverity::Warning);
    if warnings > 0 {
        parts.push(format!("Warnings: {warnings}."));
    }

    let duplicates = similarity.stats.duplicates_found;
    if duplicates > 0 {
        parts.push(format!("Potential duplicates: {duplicates}."));
    }
    let similar = similarity.stats.similar_groups_found - duplicates;
    if similar > 0 {
        parts.push(format!("Groups of similar stories: {similar}."));
    }
    parts.join(" ")
}
