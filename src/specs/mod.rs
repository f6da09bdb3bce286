//! Spec service.
//!
//! Orchestrates validation, generation, persistence and the generation
//! audit trail, and serves every read and edit the HTTP layer exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::board::{apply_and_confirm, TaskBoard};
use crate::error::{AppError, AppResult};
use crate::export::{export_document, ExportDocument};
use crate::llm::{LlmClient, LlmHealth};
use crate::planner::{Generator, TaskGroup};
use crate::storage::{
    GenerationRecord, SpecDetail, SpecSummary, SqliteStorage, Spec, Storage, Task, UserStory,
};
use crate::validation::{
    validate_brief, validate_export, validate_move, validate_reorder, validate_task_patch,
    BriefInput, ExportInput, MoveInput, ReorderInput, TaskPatchInput,
};

/// Database reachability as shown on the status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseHealth {
    Ok,
    Down,
}

/// Health of the service and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Always `"ok"` when the service answers at all.
    pub backend: String,
    pub database: DatabaseHealth,
    pub llm: LlmHealth,
    pub timestamp: DateTime<Utc>,
}

/// Result of a drag on the task board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// False when the drag was a no-op and nothing was written.
    pub changed: bool,
    /// The spec's tasks by `order` after the move.
    pub tasks: Vec<Task>,
}

/// One board column: a group and its tasks by `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub group: TaskGroup,
    pub tasks: Vec<Task>,
}

/// Spec lifecycle operations.
#[derive(Clone)]
pub struct SpecService {
    storage: SqliteStorage,
    generator: Generator,
    llm: LlmClient,
}

impl SpecService {
    /// Create a new spec service
    pub fn new(storage: SqliteStorage, generator: Generator, llm: LlmClient) -> Self {
        Self {
            storage,
            generator,
            llm,
        }
    }

    /// Validate a brief, generate its plan and persist everything.
    ///
    /// Returns the new spec id. The generation record is appended after
    /// the spec transaction commits.
    pub async fn generate_spec(&self, input: BriefInput) -> AppResult<String> {
        let brief = validate_brief(input)?;
        let start = Instant::now();

        let generated = self.generator.generate(&brief).await;

        let spec = Spec::new(&brief, generated.payload.generated_markdown.as_str());
        let stories: Vec<UserStory> = generated
            .payload
            .user_stories
            .iter()
            .map(|draft| UserStory::from_draft(&spec.id, draft))
            .collect();
        let tasks: Vec<Task> = generated
            .payload
            .tasks
            .iter()
            .map(|draft| Task::from_draft(&spec.id, draft))
            .collect();

        self.storage
            .create_spec(&spec, &stories, &tasks)
            .await
            .map_err(AppError::from_storage)?;

        let latency_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
        let record = GenerationRecord::new(spec.id.as_str(), &generated.meta, latency_ms);
        self.storage
            .record_generation(&record)
            .await
            .map_err(AppError::from_storage)?;

        info!(
            spec_id = %spec.id,
            used_fallback = generated.meta.used_fallback,
            stories = stories.len(),
            tasks = tasks.len(),
            latency_ms,
            "Spec generated"
        );

        Ok(spec.id)
    }

    /// Most recent specs, newest first.
    pub async fn list_specs(&self, limit: u32) -> AppResult<Vec<SpecSummary>> {
        self.storage
            .list_recent_specs(limit)
            .await
            .map_err(AppError::from_storage)
    }

    /// A spec with its stories and tasks.
    pub async fn get_spec(&self, id: &str) -> AppResult<SpecDetail> {
        self.storage
            .get_spec_detail(id)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(|| AppError::spec_not_found(id))
    }

    /// Apply a validated partial update to one task.
    ///
    /// The patch is applied to a board of the spec's tasks and confirmed
    /// once storage accepts it. A group or status change then re-saves the
    /// whole board layout with dense order.
    pub async fn update_task(&self, id: &str, input: TaskPatchInput) -> AppResult<Task> {
        let patch = validate_task_patch(input)?;
        let current = self
            .storage
            .get_task(id)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(|| AppError::task_not_found(id))?;
        let spec_id = current.spec_id;

        let tasks = self
            .storage
            .get_spec_tasks(&spec_id)
            .await
            .map_err(AppError::from_storage)?;
        let mut board = TaskBoard::new(tasks);
        let relayout = patch.touches_board_layout();

        let storage = &self.storage;
        let task = apply_and_confirm(&mut board, id, patch, |task_id, patch| async move {
            storage
                .update_task(&task_id, &patch)
                .await
                .map_err(AppError::from_storage)
        })
        .await?;

        if relayout {
            self.storage
                .apply_reorder(&spec_id, &board.layout_items())
                .await
                .map_err(AppError::from_storage)?;
        }

        debug!(task_id = %id, spec_id = %spec_id, relayout, "Task updated");
        Ok(task)
    }

    /// Persist a full reorder batch atomically.
    pub async fn reorder_tasks(&self, spec_id: &str, input: ReorderInput) -> AppResult<()> {
        let items = validate_reorder(input)?;
        self.storage
            .apply_reorder(spec_id, &items)
            .await
            .map_err(AppError::from_storage)
    }

    /// Drag one task onto another inside a group and persist the result.
    pub async fn move_task(&self, spec_id: &str, input: MoveInput) -> AppResult<MoveOutcome> {
        let request = validate_move(input)?;
        self.require_spec(spec_id).await?;

        let tasks = self
            .storage
            .get_spec_tasks(spec_id)
            .await
            .map_err(AppError::from_storage)?;
        let mut board = TaskBoard::new(tasks);

        let storage = &self.storage;
        let changed = board
            .move_task(
                &request.source_task_id,
                &request.target_task_id,
                request.group,
                |items| async move {
                    storage
                        .apply_reorder(spec_id, &items)
                        .await
                        .map_err(AppError::from_storage)
                },
            )
            .await?;

        if !changed {
            warn!(
                spec_id = %spec_id,
                source = %request.source_task_id,
                target = %request.target_task_id,
                group = %request.group,
                "Drag ignored: source and target are not distinct tasks of the group"
            );
        }

        let mut tasks = board.into_tasks();
        tasks.sort_by_key(|t| t.order);
        Ok(MoveOutcome { changed, tasks })
    }

    /// Board columns of a spec, groups in order of first appearance.
    pub async fn board(&self, spec_id: &str) -> AppResult<Vec<BoardColumn>> {
        self.require_spec(spec_id).await?;
        let tasks = self
            .storage
            .get_spec_tasks(spec_id)
            .await
            .map_err(AppError::from_storage)?;

        Ok(TaskBoard::new(tasks)
            .columns()
            .into_iter()
            .map(|(group, tasks)| BoardColumn { group, tasks })
            .collect())
    }

    /// Delete a spec with its stories, tasks and generation records.
    pub async fn delete_spec(&self, id: &str) -> AppResult<()> {
        self.storage
            .delete_spec(id)
            .await
            .map_err(AppError::from_storage)?;
        info!(spec_id = %id, "Spec deleted");
        Ok(())
    }

    /// Release the database pool on shutdown.
    pub async fn close(&self) {
        self.storage.close().await;
    }

    /// Render a spec's stored markdown for download.
    pub async fn export_spec(&self, id: &str, input: ExportInput) -> AppResult<ExportDocument> {
        let format = validate_export(input)?;
        let spec = self.require_spec(id).await?;
        Ok(export_document(&spec.title, &spec.generated_markdown, format))
    }

    /// Generation audit records of a spec, oldest first.
    pub async fn get_generations(&self, spec_id: &str) -> AppResult<Vec<GenerationRecord>> {
        self.require_spec(spec_id).await?;
        self.storage
            .get_generations(spec_id)
            .await
            .map_err(AppError::from_storage)
    }

    /// Probe the database and the model provider.
    pub async fn status(&self) -> StatusReport {
        let database = match self.storage.health_check().await {
            Ok(()) => DatabaseHealth::Ok,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                DatabaseHealth::Down
            }
        };

        StatusReport {
            backend: "ok".to_string(),
            database,
            llm: self.llm.ping().await,
            timestamp: Utc::now(),
        }
    }

    async fn require_spec(&self, id: &str) -> AppResult<Spec> {
        self.storage
            .get_spec(id)
            .await
            .map_err(AppError::from_storage)?
            .ok_or_else(|| AppError::spec_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, RequestConfig};
    use crate::planner::{TaskGroup, TaskStatus};

    async fn service() -> SpecService {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let config = LlmConfig::default();
        let llm = LlmClient::new(&config, RequestConfig::default()).unwrap();
        let generator = Generator::new(llm.clone(), &config);
        SpecService::new(storage, generator, llm)
    }

    fn brief() -> BriefInput {
        BriefInput {
            title: Some("Ack".to_string()),
            template_type: Some("mobile_app".to_string()),
            goal: Some("Let users acknowledge alerts".to_string()),
            users: Some("On-call engineers".to_string()),
            constraints: Some("Must work offline".to_string()),
            risk_unknowns: None,
        }
    }

    #[tokio::test]
    async fn test_generate_without_credential_uses_fallback() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();

        let detail = service.get_spec(&id).await.unwrap();
        assert_eq!(detail.user_stories.len(), 4);
        assert_eq!(detail.tasks.len(), 10);
        assert!(detail.user_stories[0]
            .story
            .contains("let users acknowledge alerts"));

        let generations = service.get_generations(&id).await.unwrap();
        assert_eq!(generations.len(), 1);
        assert!(generations[0].used_fallback);
        assert!(generations[0].total_tokens.is_none());
        assert!(generations[0].estimated_cost_usd.is_none());
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_brief() {
        let service = service().await;
        let mut input = brief();
        input.goal = Some("short".to_string());
        let err = service.generate_spec(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.list_specs(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_move_task_persists_new_order() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let tasks = service.get_spec(&id).await.unwrap().tasks;

        let backend: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.group == TaskGroup::Backend)
            .collect();
        let source = backend[backend.len() - 1].id.clone();
        let target = backend[0].id.clone();

        let outcome = service
            .move_task(
                &id,
                MoveInput {
                    source_task_id: Some(source.clone()),
                    target_task_id: Some(target.clone()),
                    group: Some("backend".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(outcome.changed);

        let stored = service.get_spec(&id).await.unwrap().tasks;
        assert_eq!(stored, outcome.tasks);
        let first_backend = stored
            .iter()
            .find(|t| t.group == TaskGroup::Backend)
            .unwrap();
        assert_eq!(first_backend.id, source);
    }

    #[tokio::test]
    async fn test_move_task_cross_group_is_noop() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let tasks = service.get_spec(&id).await.unwrap().tasks;

        let frontend = tasks.iter().find(|t| t.group == TaskGroup::Frontend).unwrap();
        let backend = tasks.iter().find(|t| t.group == TaskGroup::Backend).unwrap();

        let outcome = service
            .move_task(
                &id,
                MoveInput {
                    source_task_id: Some(frontend.id.clone()),
                    target_task_id: Some(backend.id.clone()),
                    group: Some("backend".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.tasks, tasks);
    }

    #[tokio::test]
    async fn test_move_task_unknown_spec() {
        let service = service().await;
        let err = service
            .move_task(
                "missing",
                MoveInput {
                    source_task_id: Some("a".to_string()),
                    target_task_id: Some("b".to_string()),
                    group: Some("qa".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { resource: "Spec", .. }));
    }

    #[tokio::test]
    async fn test_update_task_duplicate_title_is_validation_error() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let tasks = service.get_spec(&id).await.unwrap().tasks;

        let err = service
            .update_task(
                &tasks[1].id,
                TaskPatchInput {
                    title: Some(format!("  {}  ", tasks[0].title.to_uppercase())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let task = service
            .update_task(
                &tasks[1].id,
                TaskPatchInput {
                    status: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_export_spec_text() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let doc = service
            .export_spec(
                &id,
                ExportInput {
                    format: Some("text".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(doc.filename, "ack.txt");
        assert!(doc.content.starts_with("Ack\n\nTemplate: mobile_app"));
    }

    fn spaced_layout(tasks: &[Task]) -> ReorderInput {
        ReorderInput {
            items: Some(
                tasks
                    .iter()
                    .enumerate()
                    .map(|(idx, t)| crate::validation::ReorderItemInput {
                        id: Some(t.id.clone()),
                        order: Some(idx as i64 * 10),
                        group: Some(t.group.to_string()),
                        status: Some(t.status.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    #[tokio::test]
    async fn test_update_task_group_change_resaves_dense_layout() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let tasks = service.get_spec(&id).await.unwrap().tasks;
        service.reorder_tasks(&id, spaced_layout(&tasks)).await.unwrap();

        let task = service
            .update_task(
                &tasks[2].id,
                TaskPatchInput {
                    group: Some("qa".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(task.group, TaskGroup::Qa);

        let stored = service.get_spec(&id).await.unwrap().tasks;
        let orders: Vec<i64> = stored.iter().map(|t| t.order).collect();
        assert_eq!(orders, (0..tasks.len() as i64).collect::<Vec<i64>>());
        assert_eq!(stored[2].id, tasks[2].id);
        assert_eq!(stored[2].group, TaskGroup::Qa);
    }

    #[tokio::test]
    async fn test_update_task_title_keeps_layout() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();
        let tasks = service.get_spec(&id).await.unwrap().tasks;
        service.reorder_tasks(&id, spaced_layout(&tasks)).await.unwrap();

        service
            .update_task(
                &tasks[0].id,
                TaskPatchInput {
                    title: Some("Renamed task".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = service.get_spec(&id).await.unwrap().tasks;
        assert_eq!(stored[1].order, 10);
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let service = service().await;
        let err = service
            .update_task(
                "missing",
                TaskPatchInput {
                    status: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { resource: "Task", .. }));
    }

    #[tokio::test]
    async fn test_board_columns_follow_first_appearance() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();

        let columns = service.board(&id).await.unwrap();
        let groups: Vec<TaskGroup> = columns.iter().map(|c| c.group).collect();
        assert_eq!(
            groups,
            vec![TaskGroup::Frontend, TaskGroup::Backend, TaskGroup::Product]
        );
        let total: usize = columns.iter().map(|c| c.tasks.len()).sum();
        assert_eq!(total, 10);

        let err = service.board("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_spec() {
        let service = service().await;
        let id = service.generate_spec(brief()).await.unwrap();

        service.delete_spec(&id).await.unwrap();
        assert!(matches!(
            service.get_spec(&id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            service.delete_spec(&id).await.unwrap_err(),
            AppError::NotFound { resource: "Spec", .. }
        ));
    }

    #[tokio::test]
    async fn test_status_without_credential() {
        let service = service().await;
        let report = service.status().await;
        assert_eq!(report.backend, "ok");
        assert_eq!(report.database, DatabaseHealth::Ok);
        assert_eq!(report.llm, LlmHealth::MissingConfig);
    }
}
