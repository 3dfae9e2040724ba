//! Structural validation of a story map.
//!
//! Scoring: start at 100, subtract 20 per error, 5 per warning and 1 per
//! info, then add up to 10 bonus points for the share of stories that have
//! both a description and acceptance criteria. The result is clamped to
//! `0..=100`. Validity depends only on the presence of error issues.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use storymap_core::{ReleaseBucket, StoryId, StoryMap};
use storymap_telemetry::{debug, validation_span};

/// Descriptions at or below this many trimmed characters count as missing.
pub const MIN_DESCRIPTION_CHARS: usize = 10;
/// Titles shorter than this many trimmed characters are flagged.
pub const MIN_TITLE_CHARS: usize = 5;
/// MVP buckets above this size get a recommendation to cut scope.
pub const MAX_MVP_STORIES: usize = 15;

const ERROR_PENALTY: i64 = 20;
const WARNING_PENALTY: i64 = 5;
const INFO_PENALTY: i64 = 1;
const MAX_COMPLETENESS_BONUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    EmptyActivity,
    EmptyTask,
    MissingDescription,
    MissingCriteria,
    ShortTitle,
    DuplicateTitle,
    UnbalancedReleases,
}

/// Where in the map an issue was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueLocation {
    Map,
    Activity { activity: usize, activity_title: String },
    Task { activity: usize, task: usize, activity_title: String, task_title: String },
    Story { story: StoryId, story_title: String, task_title: String },
    Stories { stories: Vec<StoryId> },
    Releases { stories_per_release: BTreeMap<ReleaseBucket, usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    pub message: String,
    pub location: IssueLocation,
}

impl ValidationIssue {
    fn new(kind: IssueKind, severity: IssueSeverity, message: String, location: IssueLocation) -> Self {
        Self { kind, severity, message, location }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub total_activities: usize,
    pub total_tasks: usize,
    pub total_stories: usize,
    pub stories_with_description: usize,
    pub stories_with_criteria: usize,
    /// Stories that have both a description and acceptance criteria.
    pub complete_stories: usize,
    /// `(task, release)` cells with no story, over tasks that have stories.
    pub empty_cells: usize,
    pub stories_per_release: BTreeMap<ReleaseBucket, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: u8,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
    pub stats: ValidationStats,
}

impl ValidationResult {
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Error-severity issues, the ones that trigger a fix pass.
    pub fn critical_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }
}

/// Validate the structure and content completeness of `map`.
pub fn validate(map: &StoryMap) -> ValidationResult {
    let _span = validation_span(map.story_count()).entered();

    let mut issues = Vec::new();
    let mut stats = ValidationStats {
        total_activities: map.activities.len(),
        stories_per_release: ReleaseBucket::ALL.iter().map(|r| (*r, 0)).collect(),
        ..ValidationStats::default()
    };
    // Insertion-ordered so duplicate warnings follow map order.
    let mut titles: Vec<(String, Vec<StoryId>)> = Vec::new();
    let mut title_index: HashMap<String, usize> = HashMap::new();

    if map.activities.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::EmptyActivity,
            IssueSeverity::Error,
            "The map does not contain any activities".to_string(),
            IssueLocation::Map,
        ));
    }

    for (ai, activity) in map.activities.iter().enumerate() {
        if activity.tasks.is_empty() {
            issues.push(ValidationIssue::new(
                IssueKind::EmptyActivity,
                IssueSeverity::Warning,
                format!("Activity '{}' has no tasks", activity.title),
                IssueLocation::Activity { activity: ai, activity_title: activity.title.clone() },
            ));
            continue;
        }
        stats.total_tasks += activity.tasks.len();

        for (ti, task) in activity.tasks.iter().enumerate() {
            if task.stories.is_empty() {
                issues.push(ValidationIssue::new(
                    IssueKind::EmptyTask,
                    IssueSeverity::Warning,
                    format!("Task '{}' in activity '{}' has no stories", task.title, activity.title),
                    IssueLocation::Task {
                        activity: ai,
                        task: ti,
                        activity_title: activity.title.clone(),
                        task_title: task.title.clone(),
                    },
                ));
                continue;
            }

            let mut per_release: HashMap<ReleaseBucket, usize> = HashMap::new();
            for (si, story) in task.stories.iter().enumerate() {
                let id = StoryId { activity: ai, task: ti, story: si };
                let location = || IssueLocation::Story {
                    story: id,
                    story_title: story.title.clone(),
                    task_title: task.title.clone(),
                };
                stats.total_stories += 1;

                let release = story.priority.release();
                *per_release.entry(release).or_insert(0) += 1;
                *stats.stories_per_release.entry(release).or_insert(0) += 1;

                let has_description = story.description.trim().chars().count() > MIN_DESCRIPTION_CHARS;
                if has_description {
                    stats.stories_with_description += 1;
                } else {
                    issues.push(ValidationIssue::new(
                        IssueKind::MissingDescription,
                        IssueSeverity::Info,
                        format!("Story '{}' has no description", story.title),
                        location(),
                    ));
                }

                let has_criteria = !story.acceptance_criteria.is_empty();
                if has_criteria {
                    stats.stories_with_criteria += 1;
                } else {
                    issues.push(ValidationIssue::new(
                        IssueKind::MissingCriteria,
                        IssueSeverity::Warning,
                        format!("Story '{}' has no acceptance criteria", story.title),
                        location(),
                    ));
                }

                if has_description && has_criteria {
                    stats.complete_stories += 1;
                }

                if story.title.trim().chars().count() < MIN_TITLE_CHARS {
                    issues.push(ValidationIssue::new(
                        IssueKind::ShortTitle,
                        IssueSeverity::Info,
                        format!("Story title is too short: '{}'", story.title),
                        location(),
                    ));
                }

                let key = story.title.trim().to_lowercase();
                match title_index.get(&key) {
                    Some(&idx) => titles[idx].1.push(id),
                    None => {
                        title_index.insert(key.clone(), titles.len());
                        titles.push((key, vec![id]));
                    }
                }
            }

            stats.empty_cells += ReleaseBucket::ALL.iter().filter(|r| !per_release.contains_key(r)).count();
        }
    }

    for (title, ids) in titles.into_iter().filter(|(_, ids)| ids.len() > 1) {
        issues.push(ValidationIssue::new(
            IssueKind::DuplicateTitle,
            IssueSeverity::Warning,
            format!("Several stories share the title '{title}'"),
            IssueLocation::Stories { stories: ids },
        ));
    }

    if let Some(issue) = release_balance_issue(&stats) {
        issues.push(issue);
    }

    let recommendations = recommendations(&stats);
    let score = score(&issues, &stats);
    let is_valid = !issues.iter().any(ValidationIssue::is_error);

    debug!(score, issues = issues.len(), valid = is_valid, "Validation completed");

    ValidationResult { is_valid, score, issues, recommendations, stats }
}

fn release_balance_issue(stats: &ValidationStats) -> Option<ValidationIssue> {
    if stats.total_stories == 0 {
        return None;
    }
    let max = stats.stories_per_release.values().copied().max()?;
    let min = stats.stories_per_release.values().copied().min()?;

    let message = if max > 0 && min == 0 {
        "Some releases are empty. Check how stories are distributed across releases."
    } else if min > 0 && max > min * 3 {
        "Stories are unevenly distributed across releases"
    } else {
        return None;
    };

    Some(ValidationIssue::new(
        IssueKind::UnbalancedReleases,
        IssueSeverity::Info,
        message.to_string(),
        IssueLocation::Releases { stories_per_release: stats.stories_per_release.clone() },
    ))
}

fn recommendations(stats: &ValidationStats) -> Vec<String> {
    let mut out = Vec::new();

    if stats.total_stories == 0 {
        out.push("Add user stories to the map".to_string());
        return out;
    }

    let total = stats.total_stories as f64;
    let description_pct = stats.stories_with_description as f64 / total * 100.0;
    if description_pct < 50.0 {
        out.push(format!(
            "Only {description_pct:.0}% of stories have a description. \
             Add descriptions so the requirements are easier to understand."
        ));
    }

    let criteria_pct = stats.stories_with_criteria as f64 / total * 100.0;
    if criteria_pct < 70.0 {
        out.push(format!(
            "Only {criteria_pct:.0}% of stories have acceptance criteria. \
             Add acceptance criteria to every story."
        ));
    }

    let mvp = stats.stories_per_release.get(&ReleaseBucket::Mvp).copied().unwrap_or(0);
    if mvp == 0 {
        out.push("The MVP release is empty. Define the minimal feature set for the first release.".to_string());
    } else if mvp > MAX_MVP_STORIES {
        out.push(format!(
            "The MVP has too many stories ({mvp}). Consider trimming it to 10-15 stories."
        ));
    }

    out
}

fn score(issues: &[ValidationIssue], stats: &ValidationStats) -> u8 {
    let penalty: i64 = issues
        .iter()
        .map(|issue| match issue.severity {
            IssueSeverity::Error => ERROR_PENALTY,
            IssueSeverity::Warning => WARNING_PENALTY,
            IssueSeverity::Info => INFO_PENALTY,
        })
        .sum();

    let mut score = 100 - penalty;
    if stats.total_stories > 0 {
        let complete_ratio = stats.complete_stories as f64 / stats.total_stories as f64;
        let bonus = (complete_ratio * MAX_COMPLETENESS_BONUS).floor() as i64;
        score = (score + bonus).min(100);
    }
    score.clamp(0, 100) as u8
}
