//! Request validation.
//!
//! Raw request bodies are deserialized into loose `*Input` shapes where
//! every field is optional text, then checked here so that a bad request
//! reports every offending field at once.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::export::ExportFormat;
use crate::planner::{FeatureBrief, Priority, TaskGroup, TaskStatus, TemplateType};
use crate::storage::{ReorderItem, TaskPatch};

/// Default number of specs returned by a listing.
pub const DEFAULT_LIST_LIMIT: u32 = 5;
/// Largest listing page.
pub const MAX_LIST_LIMIT: u32 = 20;

pub const BRIEF_SUMMARY: &str = "Invalid input.";
pub const TASK_SUMMARY: &str = "Invalid task update payload.";
pub const REORDER_SUMMARY: &str = "Invalid reorder payload.";
pub const MOVE_SUMMARY: &str = "Invalid move payload.";
pub const EXPORT_SUMMARY: &str = "Invalid export payload.";

/// Feature brief as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BriefInput {
    pub title: Option<String>,
    pub template_type: Option<String>,
    pub goal: Option<String>,
    pub users: Option<String>,
    pub constraints: Option<String>,
    pub risk_unknowns: Option<String>,
}

/// Task patch as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatchInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    pub status: Option<String>,
    pub estimate: Option<String>,
    pub priority: Option<String>,
}

/// Reorder batch as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReorderInput {
    pub items: Option<Vec<ReorderItemInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReorderItemInput {
    pub id: Option<String>,
    pub order: Option<i64>,
    pub group: Option<String>,
    pub status: Option<String>,
}

/// Drag request as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveInput {
    pub source_task_id: Option<String>,
    pub target_task_id: Option<String>,
    pub group: Option<String>,
}

/// A validated drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub source_task_id: String,
    pub target_task_id: String,
    pub group: TaskGroup,
}

/// Export request as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportInput {
    pub format: Option<String>,
}

/// Decode a JSON body, reporting malformed JSON as a validation error.
pub fn parse_body<T: DeserializeOwned>(body: &[u8], summary: &str) -> Result<T, ValidationError> {
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::field(summary, "body", format!("Malformed JSON: {}", e)))
}

/// Validate and trim a submitted brief.
pub fn validate_brief(input: BriefInput) -> Result<FeatureBrief, ValidationError> {
    let mut err = ValidationError::new(BRIEF_SUMMARY);

    let title = required(&mut err, "title", input.title, 3, 120);
    let template_type = required_enum::<TemplateType>(&mut err, "templateType", input.template_type);
    let goal = required(&mut err, "goal", input.goal, 10, 500);
    let users = required(&mut err, "users", input.users, 5, 300);
    let constraints = required(&mut err, "constraints", input.constraints, 5, 500);
    let risk_unknowns = input
        .risk_unknowns
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    if let Some(risk) = &risk_unknowns {
        check_length(&mut err, "riskUnknowns", risk, 0, 500);
    }

    match (title, template_type, goal, users, constraints) {
        (Some(title), Some(template_type), Some(goal), Some(users), Some(constraints))
            if err.issues.is_empty() =>
        {
            Ok(FeatureBrief {
                title,
                template_type,
                goal,
                users,
                constraints,
                risk_unknowns,
            })
        }
        _ => Err(err),
    }
}

/// Validate and trim a task patch. At least one field must be present.
pub fn validate_task_patch(input: TaskPatchInput) -> Result<TaskPatch, ValidationError> {
    let mut err = ValidationError::new(TASK_SUMMARY);

    let patch = TaskPatch {
        title: optional(&mut err, "title", input.title, 3, 160),
        description: optional(&mut err, "description", input.description, 3, 1000),
        group: optional_enum(&mut err, "group", input.group),
        status: optional_enum(&mut err, "status", input.status),
        estimate: optional(&mut err, "estimate", input.estimate, 0, 40),
        priority: optional_enum::<Priority>(&mut err, "priority", input.priority),
    };

    if err.issues.is_empty() && patch.is_empty() {
        err.push("body", "At least one field must be updated.");
    }

    err.into_result().map(|_| patch)
}

/// Validate a reorder batch.
pub fn validate_reorder(input: ReorderInput) -> Result<Vec<ReorderItem>, ValidationError> {
    let mut err = ValidationError::new(REORDER_SUMMARY);

    let Some(raw_items) = input.items else {
        err.push("items", "Required");
        return Err(err);
    };

    let mut items = Vec::with_capacity(raw_items.len());
    for (idx, raw) in raw_items.into_iter().enumerate() {
        let field = |name: &str| format!("items[{}].{}", idx, name);

        let id = raw.id.filter(|id| !id.is_empty());
        if id.is_none() {
            err.push(field("id"), "Required");
        }
        let order = match raw.order {
            Some(order) if order >= 0 => Some(order),
            Some(_) => {
                err.push(field("order"), "Must be a non-negative integer");
                None
            }
            None => {
                err.push(field("order"), "Required");
                None
            }
        };
        let group = required_enum::<TaskGroup>(&mut err, &field("group"), raw.group);
        let status = required_enum::<TaskStatus>(&mut err, &field("status"), raw.status);

        if let (Some(id), Some(order), Some(group), Some(status)) = (id, order, group, status) {
            items.push(ReorderItem {
                id,
                order,
                group,
                status,
            });
        }
    }

    err.into_result().map(|_| items)
}

/// Validate a drag request.
pub fn validate_move(input: MoveInput) -> Result<MoveRequest, ValidationError> {
    let mut err = ValidationError::new(MOVE_SUMMARY);

    let source = input.source_task_id.filter(|s| !s.is_empty());
    if source.is_none() {
        err.push("sourceTaskId", "Required");
    }
    let target = input.target_task_id.filter(|s| !s.is_empty());
    if target.is_none() {
        err.push("targetTaskId", "Required");
    }
    let group = required_enum::<TaskGroup>(&mut err, "group", input.group);

    match (source, target, group) {
        (Some(source_task_id), Some(target_task_id), Some(group)) => Ok(MoveRequest {
            source_task_id,
            target_task_id,
            group,
        }),
        _ => Err(err),
    }
}

/// Export format, markdown when absent.
pub fn validate_export(input: ExportInput) -> Result<ExportFormat, ValidationError> {
    match input.format.as_deref() {
        None | Some("markdown") => Ok(ExportFormat::Markdown),
        Some("text") => Ok(ExportFormat::Text),
        Some(other) => Err(ValidationError::field(
            EXPORT_SUMMARY,
            "format",
            format!("Unknown export format: {}", other),
        )),
    }
}

/// Listing limit from a raw query value: clamped to 1..=20, 5 when
/// missing or not a number. Fractions are truncated.
pub fn clamp_limit(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_LIST_LIMIT;
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            value.clamp(1.0, f64::from(MAX_LIST_LIMIT)).trunc() as u32
        }
        _ => DEFAULT_LIST_LIMIT,
    }
}

fn check_length(err: &mut ValidationError, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min {
        err.push(field, format!("Must be at least {} characters", min));
    } else if len > max {
        err.push(field, format!("Must be at most {} characters", max));
    }
}

fn required(
    err: &mut ValidationError,
    field: &str,
    value: Option<String>,
    min: usize,
    max: usize,
) -> Option<String> {
    match value {
        Some(value) => {
            let trimmed = value.trim().to_string();
            check_length(err, field, &trimmed, min, max);
            Some(trimmed)
        }
        None => {
            err.push(field, "Required");
            None
        }
    }
}

fn optional(
    err: &mut ValidationError,
    field: &str,
    value: Option<String>,
    min: usize,
    max: usize,
) -> Option<String> {
    value.map(|value| {
        let trimmed = value.trim().to_string();
        check_length(err, field, &trimmed, min, max);
        trimmed
    })
}

fn required_enum<T: FromStr<Err = String>>(
    err: &mut ValidationError,
    field: &str,
    value: Option<String>,
) -> Option<T> {
    match value {
        Some(value) => parse_enum(err, field, &value),
        None => {
            err.push(field, "Required");
            None
        }
    }
}

fn optional_enum<T: FromStr<Err = String>>(
    err: &mut ValidationError,
    field: &str,
    value: Option<String>,
) -> Option<T> {
    value.and_then(|value| parse_enum(err, field, &value))
}

fn parse_enum<T: FromStr<Err = String>>(
    err: &mut ValidationError,
    field: &str,
    value: &str,
) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            err.push(field, message);
            None
        }
    }
}
