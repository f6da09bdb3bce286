//! Request handlers for the JSON API.
//!
//! Bodies are taken as raw bytes and decoded through
//! [`crate::validation::parse_body`] so that malformed JSON is reported
//! as a 400 with the same `{error, issues}` shape as a bad field.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::SharedState;
use crate::error::AppResult;
use crate::specs::StatusReport;
use crate::validation::{
    clamp_limit, parse_body, BriefInput, ExportInput, MoveInput, ReorderInput, TaskPatchInput,
    BRIEF_SUMMARY, EXPORT_SUMMARY, MOVE_SUMMARY, REORDER_SUMMARY, TASK_SUMMARY,
};

/// `POST /api/generate-spec`
pub async fn generate_spec(State(state): State<SharedState>, body: Bytes) -> AppResult<Json<Value>> {
    let input: BriefInput = parse_body(&body, BRIEF_SUMMARY)?;
    let spec_id = state.specs.generate_spec(input).await?;
    Ok(Json(json!({ "specId": spec_id })))
}

/// `GET /api/specs?limit=N`
pub async fn list_specs(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let limit = clamp_limit(params.get("limit").map(String::as_str));
    let specs = state.specs.list_specs(limit).await?;
    Ok(Json(json!({ "specs": specs })))
}

/// `GET /api/specs/{id}`
pub async fn get_spec(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let spec = state.specs.get_spec(&id).await?;
    Ok(Json(json!({ "spec": spec })))
}

/// `DELETE /api/specs/{id}`
pub async fn delete_spec(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.specs.delete_spec(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// `GET /api/specs/{id}/board`
pub async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let columns = state.specs.board(&id).await?;
    Ok(Json(json!({ "columns": columns })))
}

/// `PATCH /api/tasks/{id}`
pub async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let input: TaskPatchInput = parse_body(&body, TASK_SUMMARY)?;
    let task = state.specs.update_task(&id, input).await?;
    Ok(Json(json!({ "task": task })))
}

/// `PATCH /api/specs/{id}/tasks/reorder`
pub async fn reorder_tasks(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let input: ReorderInput = parse_body(&body, REORDER_SUMMARY)?;
    state.specs.reorder_tasks(&id, input).await?;
    Ok(Json(json!({ "ok": true })))
}

/// `POST /api/specs/{id}/tasks/move`
pub async fn move_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let input: MoveInput = parse_body(&body, MOVE_SUMMARY)?;
    let outcome = state.specs.move_task(&id, input).await?;
    Ok(Json(json!({
        "ok": true,
        "changed": outcome.changed,
        "tasks": outcome.tasks,
    })))
}

/// `POST /api/specs/{id}/export`; an empty body exports markdown.
pub async fn export_spec(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let input: ExportInput = if body.iter().all(u8::is_ascii_whitespace) {
        ExportInput::default()
    } else {
        parse_body(&body, EXPORT_SUMMARY)?
    };
    let document = state.specs.export_spec(&id, input).await?;
    Ok(Json(json!(document)))
}

/// `GET /api/specs/{id}/generations`
pub async fn list_generations(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let generations = state.specs.get_generations(&id).await?;
    Ok(Json(json!({ "generations": generations })))
}

/// `GET /api/status`
pub async fn status(State(state): State<SharedState>) -> Json<StatusReport> {
    Json(state.specs.status().await)
}
