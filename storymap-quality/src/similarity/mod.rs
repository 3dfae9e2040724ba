//! Duplicate and near-duplicate story detection.
//!
//! Each story becomes one text blob (title, description and acceptance
//! criteria), normalized and compared pairwise. Pairs at or above the
//! similarity threshold are connected; every connected component of two or
//! more stories is reported as a group, typed `duplicate` when its highest
//! pairwise similarity reaches the duplicate threshold.
//!
//! The caller is responsible for validating thresholds, see
//! [`SimilarityThresholds::new`].

mod grouping;
pub mod jaccard;
#[cfg(feature = "tfidf")]
pub mod tfidf;
pub mod text;

use serde::Serialize;
use std::fmt;
use storymap_core::{InputError, Language, Story, StoryId, StoryMap};
use storymap_telemetry::{debug, info, similarity_span};
use text::{StopWords, normalize};

/// How the pairwise similarity matrix is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityAlgorithm {
    /// TF-IDF cosine over unigrams and bigrams (requires the `tfidf` feature)
    TfIdf,
    /// Token-set overlap
    Jaccard,
    /// Fewer than two stories; nothing was compared
    Skipped,
}

impl SimilarityAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityAlgorithm::TfIdf => "tfidf",
            SimilarityAlgorithm::Jaccard => "jaccard",
            SimilarityAlgorithm::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SimilarityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated `(similarity, duplicate)` threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityThresholds {
    similarity: f64,
    duplicate: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self { similarity: 0.7, duplicate: 0.9 }
    }
}

impl SimilarityThresholds {
    pub const SIMILARITY_RANGE: (f64, f64) = (0.5, 1.0);
    pub const DUPLICATE_RANGE: (f64, f64) = (0.8, 1.0);

    /// Check ranges and ordering (`duplicate >= similarity`).
    ///
    /// ```rust
    /// use storymap_quality::SimilarityThresholds;
    ///
    /// assert!(SimilarityThresholds::new(0.7, 0.9).is_ok());
    /// assert!(SimilarityThresholds::new(0.4, 0.9).is_err());
    /// assert!(SimilarityThresholds::new(0.95, 0.85).is_err());
    /// ```
    pub fn new(similarity: f64, duplicate: f64) -> Result<Self, InputError> {
        check_range("similarity", similarity, Self::SIMILARITY_RANGE)?;
        check_range("duplicate", duplicate, Self::DUPLICATE_RANGE)?;
        if duplicate < similarity {
            return Err(InputError::ThresholdOrdering { similarity, duplicate });
        }
        Ok(Self { similarity, duplicate })
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    pub fn duplicate(&self) -> f64 {
        self.duplicate
    }
}

fn check_range(name: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), InputError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(InputError::ThresholdOutOfRange { name, value, min, max })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Duplicate,
    Similar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarStory {
    pub id: StoryId,
    pub title: String,
    /// Mean similarity to the other group members, rounded to two decimals.
    pub similarity: f64,
    /// `"Activity → Task"` breadcrumb
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityGroup {
    pub stories: Vec<SimilarStory>,
    pub group_type: GroupType,
    pub max_similarity: f64,
    pub recommendation: String,
}

impl SimilarityGroup {
    pub fn is_duplicate(&self) -> bool {
        self.group_type == GroupType::Duplicate
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.stories.iter().map(|s| s.title.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityStats {
    pub total_stories: usize,
    /// Number of duplicate groups
    pub duplicates_found: usize,
    /// Number of groups of either type
    pub similar_groups_found: usize,
    pub algorithm: SimilarityAlgorithm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub similar_groups: Vec<SimilarityGroup>,
    pub stats: SimilarityStats,
}

impl SimilarityResult {
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &SimilarityGroup> {
        self.similar_groups.iter().filter(|g| g.is_duplicate())
    }
}

const DUPLICATE_RECOMMENDATION: &str =
    "Possible duplicates. Merge these stories or make the difference between them explicit.";
const SIMILAR_RECOMMENDATION: &str =
    "Similar stories. Check whether their functionality overlaps and consider separating the scope of each.";

#[derive(Debug, Clone)]
pub struct SimilarityDetector {
    stop_words: StopWords,
    algorithm: SimilarityAlgorithm,
}

impl Default for SimilarityDetector {
    fn default() -> Self {
        Self { stop_words: StopWords::all(), algorithm: preferred_algorithm() }
    }
}

fn preferred_algorithm() -> SimilarityAlgorithm {
    if cfg!(feature = "tfidf") { SimilarityAlgorithm::TfIdf } else { SimilarityAlgorithm::Jaccard }
}

impl SimilarityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use only the stop words of `language`.
    pub fn for_language(language: Language) -> Self {
        Self { stop_words: StopWords::for_language(language), ..Self::default() }
    }

    /// Force Jaccard even when TF-IDF is compiled in.
    #[must_use]
    pub fn jaccard_only(mut self) -> Self {
        self.algorithm = SimilarityAlgorithm::Jaccard;
        self
    }

    /// Pairwise similarity matrix of the normalized `texts`, plus the
    /// algorithm that produced it.
    pub fn similarity_matrix(&self, texts: &[String]) -> (Vec<Vec<f64>>, SimilarityAlgorithm) {
        let (mut matrix, algorithm) = self.raw_matrix(texts);

        // Identical non-empty blobs are always a perfect match.
        for i in 0..texts.len() {
            for j in (i + 1)..texts.len() {
                if !texts[i].is_empty() && texts[i] == texts[j] {
                    matrix[i][j] = 1.0;
                    matrix[j][i] = 1.0;
                }
            }
        }
        (matrix, algorithm)
    }

    #[cfg(feature = "tfidf")]
    fn raw_matrix(&self, texts: &[String]) -> (Vec<Vec<f64>>, SimilarityAlgorithm) {
        if self.algorithm == SimilarityAlgorithm::TfIdf {
            match tfidf::tfidf_matrix(texts, &self.stop_words) {
                Some(matrix) => return (matrix, SimilarityAlgorithm::TfIdf),
                None => debug!("TF-IDF vocabulary is empty after pruning, using Jaccard"),
            }
        }
        (jaccard::jaccard_matrix(texts, &self.stop_words), SimilarityAlgorithm::Jaccard)
    }

    #[cfg(not(feature = "tfidf"))]
    fn raw_matrix(&self, texts: &[String]) -> (Vec<Vec<f64>>, SimilarityAlgorithm) {
        (jaccard::jaccard_matrix(texts, &self.stop_words), SimilarityAlgorithm::Jaccard)
    }

    /// Group similar stories of `map`.
    ///
    /// Expects `duplicate_threshold >= similarity_threshold`, both within the
    /// ranges of [`SimilarityThresholds`]; they are not re-checked here.
    pub fn analyze(&self, map: &StoryMap, similarity_threshold: f64, duplicate_threshold: f64) -> SimilarityResult {
        let stories: Vec<_> = map.stories().collect();
        let _span = similarity_span(stories.len()).entered();

        if stories.len() < 2 {
            debug!(stories = stories.len(), "Fewer than two stories, skipping similarity analysis");
            return SimilarityResult {
                similar_groups: Vec::new(),
                stats: SimilarityStats {
                    total_stories: stories.len(),
                    duplicates_found: 0,
                    similar_groups_found: 0,
                    algorithm: SimilarityAlgorithm::Skipped,
                },
            };
        }

        let texts: Vec<String> = stories.iter().map(|s| story_text(s.story)).collect();
        let (matrix, algorithm) = self.similarity_matrix(&texts);

        let mut groups: Vec<SimilarityGroup> = grouping::components(&matrix, similarity_threshold)
            .into_iter()
            .map(|members| {
                let max_similarity = grouping::max_pairwise(&matrix, &members);
                let group_type =
                    if max_similarity >= duplicate_threshold { GroupType::Duplicate } else { GroupType::Similar };

                let mut similar: Vec<SimilarStory> = members
                    .iter()
                    .map(|&idx| SimilarStory {
                        id: stories[idx].id,
                        title: stories[idx].story.title.clone(),
                        similarity: round2(grouping::mean_to_others(&matrix, &members, idx)),
                        context: stories[idx].context(),
                    })
                    .collect();
                similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

                let recommendation = match group_type {
                    GroupType::Duplicate => DUPLICATE_RECOMMENDATION,
                    GroupType::Similar => SIMILAR_RECOMMENDATION,
                };
                SimilarityGroup { stories: similar, group_type, max_similarity, recommendation: recommendation.to_string() }
            })
            .collect();

        // duplicates first, then larger groups
        groups.sort_by_key(|g| (!g.is_duplicate(), std::cmp::Reverse(g.stories.len())));

        let duplicates_found = groups.iter().filter(|g| g.is_duplicate()).count();
        info!(
            stories = stories.len(),
            groups = groups.len(),
            duplicates = duplicates_found,
            algorithm = %algorithm,
            "Similarity analysis completed"
        );

        SimilarityResult {
            stats: SimilarityStats {
                total_stories: stories.len(),
                duplicates_found,
                similar_groups_found: groups.len(),
                algorithm,
            },
            similar_groups: groups,
        }
    }
}

/// Normalized title, description and acceptance criteria of `story`, the
/// text that gets compared.
pub fn story_text(story: &Story) -> String {
    normalize(&format!("{} {} {}", story.title, story.description, story.acceptance_criteria.join(" ")))
}

/// [`SimilarityDetector::analyze`] with the default detector.
pub fn analyze(map: &StoryMap, similarity_threshold: f64, duplicate_threshold: f64) -> SimilarityResult {
    SimilarityDetector::default().analyze(map, similarity_threshold, duplicate_threshold)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use storymap_core::{Activity, Priority, Task};

    fn map_of(stories: Vec<Story>) -> StoryMap {
        let task = stories.into_iter().fold(Task::new("Checkout"), Task::with_story);
        StoryMap::new("Shop").with_activity(Activity::new("Buy").with_task(task))
    }

    fn pay_by_card() -> Story {
        Story::new("Pay by card", "As a shopper I want to pay for my order by credit card", Priority::Mvp)
            .with_criteria(["Card form validates number", "Receipt is emailed"])
    }

    #[test]
    fn test_fewer_than_two_stories_is_skipped() {
        let result = analyze(&map_of(vec![pay_by_card()]), 0.7, 0.9);
        assert!(result.similar_groups.is_empty());
        assert_eq!(result.stats.algorithm, SimilarityAlgorithm::Skipped);
        assert_eq!(result.stats.total_stories, 1);
    }

    #[test]
    fn test_identical_stories_are_duplicates() {
        let result = analyze(&map_of(vec![pay_by_card(), pay_by_card()]), 1.0, 1.0);
        assert_eq!(result.similar_groups.len(), 1);
        let group = &result.similar_groups[0];
        assert_eq!(group.group_type, GroupType::Duplicate);
        assert_eq!(group.max_similarity, 1.0);
        assert!(group.stories.iter().all(|s| s.similarity == 1.0));
        assert_eq!(group.stories[0].context, "Buy → Checkout");
        assert_eq!(result.stats.duplicates_found, 1);
    }

    #[test]
    fn test_distinct_stories_form_no_groups() {
        let result = analyze(
            &map_of(vec![
                pay_by_card(),
                Story::new("Track delivery", "See where the parcel currently is on a map", Priority::Later)
                    .with_criterion("Courier position refreshes"),
                Story::new("Export invoices", "Download monthly invoices as PDF files", Priority::Release1)
                    .with_criterion("Zip archive for a whole year"),
            ]),
            0.7,
            0.9,
        );
        assert!(result.similar_groups.is_empty());
        assert_eq!(result.stats.algorithm, preferred_algorithm());
    }

    #[test]
    fn test_jaccard_only_detector() {
        let result = SimilarityDetector::new().jaccard_only().analyze(
            &map_of(vec![pay_by_card(), pay_by_card(), pay_by_card()]),
            0.7,
            0.9,
        );
        assert_eq!(result.stats.algorithm, SimilarityAlgorithm::Jaccard);
        assert_eq!(result.similar_groups[0].stories.len(), 3);
    }

    #[test]
    fn test_groups_sorted_duplicates_first() {
        // Two near copies plus a looser pair.
        let looser_a = Story::new("Wishlist save", "save book wishlist later reading", Priority::Later);
        let looser_b = Story::new("Wishlist share", "share book wishlist later reading", Priority::Later);
        let detector = SimilarityDetector::new().jaccard_only();
        let result = detector.analyze(&map_of(vec![looser_a, looser_b, pay_by_card(), pay_by_card()]), 0.5, 0.95);
        assert_eq!(result.similar_groups.len(), 2);
        assert!(result.similar_groups[0].is_duplicate());
        assert!(!result.similar_groups[1].is_duplicate());
        assert_eq!(result.similar_groups[1].recommendation, SIMILAR_RECOMMENDATION);
    }

    #[test]
    fn test_threshold_validation() {
        assert_eq!(
            SimilarityThresholds::new(0.9, 0.85),
            Err(InputError::ThresholdOrdering { similarity: 0.9, duplicate: 0.85 })
        );
        assert!(matches!(
            SimilarityThresholds::new(0.7, 0.5),
            Err(InputError::ThresholdOutOfRange { name: "duplicate", .. })
        ));
        assert_eq!(SimilarityThresholds::default(), SimilarityThresholds::new(0.7, 0.9).unwrap());
    }
}
