//! Defensive extraction of the model's JSON payload.
//!
//! The model is asked for bare JSON but is free to wrap it in prose or a
//! fenced block. Extraction never fails on its own; whatever it returns is
//! handed to serde, and any parse or shape error becomes
//! [`LlmError::MalformedOutput`].

use serde::Deserialize;

use super::types::{Priority, TaskGroup, TaskStatus};
use crate::error::{LlmError, LlmResult};

/// Story as emitted by the model, before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStory {
    pub story: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
}

/// Task as emitted by the model, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub title: String,
    pub description: String,
    pub group: TaskGroup,
    pub status: TaskStatus,
    #[serde(default)]
    pub estimate: Option<String>,
    pub priority: Priority,
}

/// Structurally valid model output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    pub user_stories: Vec<RawStory>,
    pub tasks: Vec<RawTask>,
}

/// Pick the most plausible JSON object out of a completion.
///
/// Attempts, in order:
/// 1. the trimmed text when it is already a bare `{...}` object
/// 2. the body of a ```` ```json ```` fenced block (label matched case-insensitively)
/// 3. the span from the first `{` to the last `}`
/// 4. the trimmed text unchanged
pub fn extract_json_object(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed;
    }

    if let Some(body) = fenced_json_block(trimmed) {
        return body;
    }

    if let (Some(first), Some(last)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if last > first {
            return &trimmed[first..=last];
        }
    }

    trimmed
}

fn fenced_json_block(text: &str) -> Option<&str> {
    const FENCE: &str = "```json";

    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();
    let start = lowered.find(FENCE)? + FENCE.len();
    let end = start + text[start..].find("```")?;

    Some(text[start..end].trim()).filter(|body| !body.is_empty())
}

/// Extract and deserialize a model completion into a [`RawPayload`].
pub fn parse_model_payload(raw: &str) -> LlmResult<RawPayload> {
    let candidate = extract_json_object(raw);
    serde_json::from_str(candidate).map_err(|e| LlmError::MalformedOutput {
        message: format!(
            "{} (first 100 chars: '{}')",
            e,
            candidate.chars().take(100).collect::<String>()
        ),
    })
}
