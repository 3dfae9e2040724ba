//! Prompt templates for generation, repair and story improvement.

use storymap_core::{Language, Story};
use storymap_quality::{SimilarityGroup, ValidationIssue};

/// Titles listed per duplicate group before the rest are summarized.
const MAX_TITLES_PER_GROUP: usize = 3;

const MAP_TEMPLATE: &str = r#"{
  "productName": "Proposed product name",
  "personas": ["Persona 1", "Persona 2"],
  "map": [
    {
      "activity": "High-level user activity (e.g. Account management)",
      "tasks": [
        {
          "taskTitle": "Concrete user step (e.g. Sign up)",
          "stories": [
            {
              "title": "User story title (e.g. Sign up with email)",
              "description": "As a [persona], I want ..., so that ...",
              "priority": "MVP",
              "acceptanceCriteria": ["Criterion 1", "Criterion 2"]
            }
          ]
        }
      ]
    }
  ]
}"#;

pub(crate) fn generation_system(language: Language) -> String {
    format!(
        "You are an expert Product Manager and Business Analyst specializing in User Story Mapping.\n\
         Turn unstructured product requirements into a structured User Story Map in JSON.\n\n\
         Write every title, description and criterion in {lang}.\n\
         Follow the JSON structure exactly and return ONLY the JSON object, with no conversational text.",
        lang = language.prompt_name()
    )
}

pub(crate) fn generation_user(requirements: &str, language: Language) -> String {
    format!(
        "Analyze the product requirements in triple quotes:\n\n\
         \"\"\"\n{requirements}\n\"\"\"\n\n\
         Your job:\n\
         1. Identify the main user personas.\n\
         2. Build the backbone of the map: high-level activities (user goals), each split into sequential user tasks.\n\
         3. Break every task into concrete user stories.\n\
         4. Give every story exactly one priority: \"MVP\", \"Release 1\" or \"Later\".\n\
         5. Attach at least 2 acceptance criteria to every story.\n\n\
         All text must be in {lang}.\n\n\
         Return ONLY valid JSON in exactly this structure:\n{MAP_TEMPLATE}",
        lang = language.prompt_name()
    )
}

pub(crate) fn fix_system(language: Language) -> String {
    format!(
        "You are a User Story Mapping expert. Repair the problems in an existing User Story Map.\n\n\
         Rules:\n\
         1. Keep all existing good content.\n\
         2. Fix only the listed problems.\n\
         3. Do not remove information; complete or correct it instead.\n\
         4. Merge duplicate stories or make the difference between them explicit.\n\
         5. Write all text in {lang}.\n\
         6. Return ONLY valid JSON.",
        lang = language.prompt_name()
    )
}

pub(crate) fn fix_user<'a, I, G>(map_json: &str, issues: I, duplicate_groups: G, language: Language) -> String
where
    I: IntoIterator<Item = &'a ValidationIssue>,
    G: IntoIterator<Item = &'a SimilarityGroup>,
{
    let mut problems: Vec<String> = issues.into_iter().map(|issue| format!("- {}", issue.message)).collect();

    let duplicates = duplicate_lines(duplicate_groups);
    if !duplicates.is_empty() {
        problems.push("Duplicate stories found:".to_string());
        problems.extend(duplicates);
    }

    format!(
        "Current User Story Map:\n```json\n{map_json}\n```\n\n\
         Problems found:\n{problems}\n\n\
         Fix these problems and return the corrected map in the same JSON format.\n\
         Every story needs at least 2 acceptance criteria. All text must be in {lang}.\n\n\
         Return ONLY the corrected JSON, with no additional text.",
        problems = problems.join("\n"),
        lang = language.prompt_name()
    )
}

fn duplicate_lines<'a, G>(groups: G) -> Vec<String>
where
    G: IntoIterator<Item = &'a SimilarityGroup>,
{
    let mut lines = Vec::new();
    for group in groups {
        let titles: Vec<&str> = group.titles().collect();
        let shown = titles.iter().take(MAX_TITLES_PER_GROUP).copied().collect::<Vec<_>>().join(", ");
        lines.push(format!("  - Duplicates: {shown}"));
        if titles.len() > MAX_TITLES_PER_GROUP {
            lines.push(format!("    ... and {} more", titles.len() - MAX_TITLES_PER_GROUP));
        }
    }
    lines
}

pub(crate) fn improve_system(language: Language) -> String {
    format!(
        "You are an expert Product Manager and Business Analyst. Improve user stories on request.\n\n\
         Rules:\n\
         - Write all text in {lang}\n\
         - Keep the structure and format of the story\n\
         - Be concrete and practical\n\
         - Return ONLY valid JSON with no additional text",
        lang = language.prompt_name()
    )
}

pub(crate) fn improve_user(story: &Story, request: &str, instruction: Option<&str>) -> String {
    let criteria = serde_json::to_string(&story.acceptance_criteria).unwrap_or_else(|_| "[]".to_string());
    let action_line = instruction.map(|i| format!("Action: {i}\n")).unwrap_or_default();
    format!(
        "Current story:\n\
         Title: {title}\n\
         Description: {description}\n\
         Priority: {priority}\n\
         Acceptance criteria: {criteria}\n\n\
         User request: {request}\n\
         {action_line}\n\
         Improve this story according to the request.\n\n\
         For a split, return JSON in this format:\n\
         {{\n  \"action\": \"split\",\n  \"stories\": [\n    {{\"title\": \"First story\", \"description\": \"Description\", \
         \"priority\": \"MVP\", \"acceptanceCriteria\": [\"Criterion 1\", \"Criterion 2\"]}}\n  ],\n  \
         \"suggestion\": \"Why it was split this way\"\n}}\n\n\
         In every other case, return JSON in this format:\n\
         {{\n  \"action\": \"improve\",\n  \"title\": \"Improved title\",\n  \"description\": \"Improved description\",\n  \
         \"priority\": \"MVP | Release 1 | Later\",\n  \"acceptanceCriteria\": [\"Criterion 1\", \"Criterion 2\"],\n  \
         \"suggestion\": \"Short explanation of the changes\"\n}}\n\n\
         Return ONLY valid JSON, without markdown formatting.",
        title = story.title,
        description = story.description,
        priority = story.priority,
    )
}
