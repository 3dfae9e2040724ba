//! Parsing of model output into typed values.

use serde::de::DeserializeOwned;
use storymap_core::{Result, StoryMapError};
use storymap_telemetry::debug;

const PREVIEW_CHARS: usize = 500;

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence, if any.
///
/// ```rust
/// use storymap_agent::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Strip fences and deserialize `text` strictly into `T`.
///
/// Blank output is [`StoryMapError::EmptyResponse`]; anything that does not
/// deserialize is [`StoryMapError::MalformedResponse`].
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(StoryMapError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(PREVIEW_CHARS).collect();
        debug!(error = %e, preview = %preview, "Model output did not match the expected shape");
        StoryMapError::MalformedResponse(e.to_string())
    })
}
