//! Storage layer for spec persistence.
//!
//! This module provides SQLite-based storage for specs, their user stories
//! and tasks, and the generation audit trail.

mod sqlite;


pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::planner::{
    FeatureBrief, GenerationMeta, Priority, StoryDraft, TaskDraft, TaskGroup, TaskStatus,
    TemplateType,
};

/// A stored plan for one feature idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Unique spec identifier.
    pub id: String,
    pub title: String,
    pub template_type: TemplateType,
    pub goal: String,
    pub users: String,
    pub constraints: String,
    pub risk_unknowns: Option<String>,
    /// Markdown rendered at generation time.
    pub generated_markdown: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A spec with its stories and tasks, each ascending by `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDetail {
    #[serde(flatten)]
    pub spec: Spec,
    pub user_stories: Vec<UserStory>,
    pub tasks: Vec<Task>,
}

/// Listing row for recent specs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    pub id: String,
    pub title: String,
    pub template_type: TemplateType,
    pub created_at: DateTime<Utc>,
}

/// A persisted user story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    pub id: String,
    pub spec_id: String,
    pub story: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
    pub order: i64,
}

/// A persisted engineering task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub spec_id: String,
    pub title: String,
    pub description: String,
    pub group: TaskGroup,
    pub status: TaskStatus,
    pub estimate: Option<String>,
    pub priority: Priority,
    /// Global position within the spec; compared per group for display.
    pub order: i64,
}

/// Partial task update. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<TaskGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// `Some("")` clears the estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// One row of a reorder batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: String,
    pub order: i64,
    pub group: TaskGroup,
    pub status: TaskStatus,
}

/// Audit record for one generation attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: String,
    pub spec_id: String,
    pub model: String,
    pub latency_ms: i64,
    pub success: bool,
    pub used_fallback: bool,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub estimated_cost_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Spec {
    /// Create a new spec from a validated brief
    pub fn new(brief: &FeatureBrief, generated_markdown: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: brief.title.clone(),
            template_type: brief.template_type,
            goal: brief.goal.clone(),
            users: brief.users.clone(),
            constraints: brief.constraints.clone(),
            risk_unknowns: brief.risk_unknowns.clone(),
            generated_markdown: generated_markdown.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UserStory {
    /// Assign storage ids to a generated story
    pub fn from_draft(spec_id: &str, draft: &StoryDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spec_id: spec_id.to_string(),
            story: draft.story.clone(),
            acceptance_criteria: draft.acceptance_criteria.clone(),
            priority: draft.priority,
            order: draft.order,
        }
    }
}

impl Task {
    /// Assign storage ids to a generated task
    pub fn from_draft(spec_id: &str, draft: &TaskDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spec_id: spec_id.to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            group: draft.group,
            status: draft.status,
            estimate: draft.estimate.clone(),
            priority: draft.priority,
            order: draft.order,
        }
    }

    /// Apply a patch in place
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(group) = patch.group {
            self.group = group;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(estimate) = &patch.estimate {
            self.estimate = Some(estimate.clone()).filter(|e| !e.is_empty());
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }

    /// Reorder row carrying this task's current position, group and status
    pub fn reorder_item(&self) -> ReorderItem {
        ReorderItem {
            id: self.id.clone(),
            order: self.order,
            group: self.group,
            status: self.status,
        }
    }
}

impl TaskPatch {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.group.is_none()
            && self.status.is_none()
            && self.estimate.is_none()
            && self.priority.is_none()
    }

    /// Group and status edits change how the board partitions tasks, so
    /// the full order must be re-sent afterwards.
    pub fn touches_board_layout(&self) -> bool {
        self.group.is_some() || self.status.is_some()
    }
}

impl GenerationRecord {
    /// Record a completed generation for `spec_id`
    pub fn new(spec_id: impl Into<String>, meta: &GenerationMeta, latency_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            spec_id: spec_id.into(),
            model: meta.model.clone(),
            latency_ms,
            success: true,
            used_fallback: meta.used_fallback,
            prompt_tokens: meta.usage.prompt_tokens,
            completion_tokens: meta.usage.completion_tokens,
            total_tokens: meta.usage.total_tokens,
            estimated_cost_usd: meta.estimated_cost_usd,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Storage Trait
// ============================================================================

/// Persistence operations for specs and their plans.
#[async_trait]
pub trait Storage: Send + Sync {
    // Spec operations

    /// Insert a spec with its stories and tasks in one transaction.
    async fn create_spec(
        &self,
        spec: &Spec,
        stories: &[UserStory],
        tasks: &[Task],
    ) -> StorageResult<()>;
    /// Get a spec by ID.
    async fn get_spec(&self, id: &str) -> StorageResult<Option<Spec>>;
    /// Get a spec with stories and tasks ordered by `order`.
    async fn get_spec_detail(&self, id: &str) -> StorageResult<Option<SpecDetail>>;
    /// Most recent specs first.
    async fn list_recent_specs(&self, limit: u32) -> StorageResult<Vec<SpecSummary>>;
    /// Delete a spec; stories, tasks and generation records cascade.
    async fn delete_spec(&self, id: &str) -> StorageResult<()>;

    // Task operations

    /// Get a task by ID.
    async fn get_task(&self, id: &str) -> StorageResult<Option<Task>>;
    /// All tasks of a spec ordered by `order`.
    async fn get_spec_tasks(&self, spec_id: &str) -> StorageResult<Vec<Task>>;
    /// Apply a patch, enforcing per-spec title uniqueness.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> StorageResult<Task>;
    /// Write every `(order, group, status)` triple atomically.
    async fn apply_reorder(&self, spec_id: &str, items: &[ReorderItem]) -> StorageResult<()>;

    // Generation audit

    /// Append a generation record.
    async fn record_generation(&self, record: &GenerationRecord) -> StorageResult<()>;
    /// Generation records of a spec, oldest first.
    async fn get_generations(&self, spec_id: &str) -> StorageResult<Vec<GenerationRecord>>;

    /// Trivial round-trip query.
    async fn health_check(&self) -> StorageResult<()>;
}
