//! The story map tree: activities → tasks → stories.
//!
//! Every list is ordered; downstream renderers display items in sequence.
//! Parsing is strict: a missing required field or an unknown priority label
//! is a deserialization error rather than a silently defaulted value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Release priority assigned to a story.
///
/// Serialized case-sensitively as `"MVP"`, `"Release 1"` or `"Later"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "MVP")]
    Mvp,
    #[serde(rename = "Release 1")]
    Release1,
    #[serde(rename = "Later")]
    Later,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Mvp, Priority::Release1, Priority::Later];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Mvp => "MVP",
            Priority::Release1 => "Release 1",
            Priority::Later => "Later",
        }
    }

    pub fn release(&self) -> ReleaseBucket {
        match self {
            Priority::Mvp => ReleaseBucket::Mvp,
            Priority::Release1 => ReleaseBucket::Release1,
            Priority::Later => ReleaseBucket::Later,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release column a story lands in when the map is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReleaseBucket {
    #[serde(rename = "MVP")]
    Mvp,
    #[serde(rename = "Release 1")]
    Release1,
    #[serde(rename = "Later")]
    Later,
}

impl ReleaseBucket {
    pub const ALL: [ReleaseBucket; 3] =
        [ReleaseBucket::Mvp, ReleaseBucket::Release1, ReleaseBucket::Later];

    /// Lenient mapping used by layers that store free-form priority labels.
    ///
    /// ```rust
    /// use storymap_core::ReleaseBucket;
    ///
    /// assert_eq!(ReleaseBucket::from_priority_label("mvp"), ReleaseBucket::Mvp);
    /// assert_eq!(ReleaseBucket::from_priority_label("release-1"), ReleaseBucket::Release1);
    /// assert_eq!(ReleaseBucket::from_priority_label("someday"), ReleaseBucket::Later);
    /// ```
    pub fn from_priority_label(label: &str) -> Self {
        let upper = label.to_uppercase();
        if upper.contains("MVP") {
            ReleaseBucket::Mvp
        } else if upper.contains("RELEASE") || upper.contains('1') {
            ReleaseBucket::Release1
        } else {
            ReleaseBucket::Later
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseBucket::Mvp => "MVP",
            ReleaseBucket::Release1 => "Release 1",
            ReleaseBucket::Later => "Later",
        }
    }
}

impl fmt::Display for ReleaseBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(default, alias = "acceptance_criteria")]
    pub acceptance_criteria: Vec<String>,
}

impl Story {
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            acceptance_criteria: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.acceptance_criteria.push(criterion.into());
        self
    }

    #[must_use]
    pub fn with_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria.extend(criteria.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "taskTitle")]
    pub title: String,
    pub stories: Vec<Story>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), stories: Vec::new() }
    }

    #[must_use]
    pub fn with_story(mut self, story: Story) -> Self {
        self.stories.push(story);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "activity")]
    pub title: String,
    pub tasks: Vec<Task>,
}

impl Activity {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), tasks: Vec::new() }
    }

    #[must_use]
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMap {
    pub product_name: String,
    #[serde(default)]
    pub personas: Vec<String>,
    #[serde(rename = "map")]
    pub activities: Vec<Activity>,
}

impl StoryMap {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self { product_name: product_name.into(), personas: Vec::new(), activities: Vec::new() }
    }

    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.personas.push(persona.into());
        self
    }

    #[must_use]
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn task_count(&self) -> usize {
        self.activities.iter().map(|a| a.tasks.len()).sum()
    }

    pub fn story_count(&self) -> usize {
        self.activities.iter().flat_map(|a| &a.tasks).map(|t| t.stories.len()).sum()
    }

    /// Walks every story in rendering order together with its position.
    pub fn stories(&self) -> impl Iterator<Item = StoryRef<'_>> + '_ {
        self.activities.iter().enumerate().flat_map(|(ai, activity)| {
            activity.tasks.iter().enumerate().flat_map(move |(ti, task)| {
                task.stories.iter().enumerate().map(move |(si, story)| StoryRef {
                    id: StoryId { activity: ai, task: ti, story: si },
                    activity: &activity.title,
                    task: &task.title,
                    story,
                })
            })
        })
    }
}

/// Position of a story inside a map (zero-based indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoryId {
    pub activity: usize,
    pub task: usize,
    pub story: usize,
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.activity + 1, self.task + 1, self.story + 1)
    }
}

/// Borrowed view of a story and the activity/task it sits under.
#[derive(Debug, Clone, Copy)]
pub struct StoryRef<'a> {
    pub id: StoryId,
    pub activity: &'a str,
    pub task: &'a str,
    pub story: &'a Story,
}

impl StoryRef<'_> {
    /// `"Activity → Task"` breadcrumb.
    pub fn context(&self) -> String {
        format!("{} → {}", self.activity, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoryMap {
        StoryMap::new("Bookstore").with_persona("Reader").with_activity(
            Activity::new("Discover")
                .with_task(
                    Task::new("Search")
                        .with_story(Story::new("Search by title", "Find books by title", Priority::Mvp))
                        .with_story(Story::new("Filter", "Filter by genre", Priority::Later)),
                )
                .with_task(Task::new("Browse")),
        )
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["productName"], "Bookstore");
        assert_eq!(value["map"][0]["activity"], "Discover");
        assert_eq!(value["map"][0]["tasks"][0]["taskTitle"], "Search");
        assert_eq!(value["map"][0]["tasks"][0]["stories"][0]["priority"], "MVP");
        assert!(value["map"][0]["tasks"][0]["stories"][0]["acceptanceCriteria"].is_array());
    }

    #[test]
    fn test_priority_is_case_sensitive() {
        assert!(serde_json::from_str::<Priority>("\"Release 1\"").is_ok());
        assert!(serde_json::from_str::<Priority>("\"mvp\"").is_err());
        assert!(serde_json::from_str::<Priority>("\"Release1\"").is_err());
    }

    #[test]
    fn test_missing_map_is_rejected() {
        let err = serde_json::from_str::<StoryMap>(r#"{"productName": "X", "personas": []}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let json = r#"{"productName": "X", "map": [{"activity": "A", "tasks": "none"}]}"#;
        assert!(serde_json::from_str::<StoryMap>(json).is_err());
    }

    #[test]
    fn test_missing_criteria_defaults_to_empty() {
        let json = r#"{"title": "T", "description": "D", "priority": "Later"}"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert!(story.acceptance_criteria.is_empty());
    }

    #[test]
    fn test_counts_and_iteration() {
        let map = sample();
        assert_eq!(map.task_count(), 2);
        assert_eq!(map.story_count(), 2);

        let refs: Vec<_> = map.stories().collect();
        assert_eq!(refs[1].id, StoryId { activity: 0, task: 0, story: 1 });
        assert_eq!(refs[1].id.to_string(), "1.1.2");
        assert_eq!(refs[1].context(), "Discover → Search");
    }

    #[test]
    fn test_release_bucket_from_label() {
        assert_eq!(ReleaseBucket::from_priority_label("MVP"), ReleaseBucket::Mvp);
        assert_eq!(ReleaseBucket::from_priority_label("Release 1"), ReleaseBucket::Release1);
        assert_eq!(ReleaseBucket::from_priority_label("R1"), ReleaseBucket::Release1);
        assert_eq!(ReleaseBucket::from_priority_label("Later"), ReleaseBucket::Later);
        assert_eq!(Priority::Release1.release(), ReleaseBucket::Release1);
    }
}
