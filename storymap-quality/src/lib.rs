//! # storymap-quality
//!
//! Automated quality gates for generated story maps.
//!
//! - [`validate`] - rule-based structural checks with a 0-100 score
//! - [`analyze`] / [`SimilarityDetector`] - duplicate and near-duplicate story detection
//! - [`full_analysis`] - both of the above combined into an overall score
//!
//! All functions are pure: they only read the map.
//!
//! ```rust
//! use storymap_core::{Activity, Priority, Story, StoryMap, Task};
//! use storymap_quality::{SimilarityThresholds, full_analysis};
//!
//! let map = StoryMap::new("Notes").with_activity(
//!     Activity::new("Write").with_task(
//!         Task::new("Edit").with_story(
//!             Story::new("Create a note", "As a writer I can create a new note", Priority::Mvp)
//!                 .with_criterion("A blank note opens"),
//!         ),
//!     ),
//! );
//!
//! let report = full_analysis(&map, SimilarityThresholds::default());
//! assert!(report.validation.is_valid);
//! ```

pub mod report;
pub mod similarity;
pub mod validation;

pub use report::{FullAnalysis, full_analysis, overall_score, similarity_summary, validation_summary};
pub use similarity::{
    GroupType, SimilarStory, SimilarityAlgorithm, SimilarityDetector, SimilarityGroup, SimilarityResult,
    SimilarityStats, SimilarityThresholds, analyze, story_text,
};
pub use validation::{
    IssueKind, IssueLocation, IssueSeverity, ValidationIssue, ValidationResult, ValidationStats, validate,
};
