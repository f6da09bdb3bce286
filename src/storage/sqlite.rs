use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{
    GenerationRecord, ReorderItem, Spec, SpecDetail, SpecSummary, Storage, Task, TaskPatch,
    UserStory,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::planner::title_key;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create a private in-memory database (single connection so every
    /// query sees the same data)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Close every pooled connection. Later queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_spec(
        &self,
        spec: &Spec,
        stories: &[UserStory],
        tasks: &[Task],
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO specs (id, title, template_type, goal, users, constraints,
                               risk_unknowns, generated_markdown, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&spec.id)
        .bind(&spec.title)
        .bind(spec.template_type.as_str())
        .bind(&spec.goal)
        .bind(&spec.users)
        .bind(&spec.constraints)
        .bind(&spec.risk_unknowns)
        .bind(&spec.generated_markdown)
        .bind(spec.created_at.to_rfc3339())
        .bind(spec.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for story in stories {
            let criteria = serde_json::to_string(&story.acceptance_criteria).map_err(|e| {
                StorageError::Query {
                    message: format!("Failed to encode acceptance criteria: {}", e),
                }
            })?;

            sqlx::query(
                r#"
                INSERT INTO user_stories (id, spec_id, story, acceptance_criteria, priority, sort_order)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&story.id)
            .bind(&spec.id)
            .bind(&story.story)
            .bind(criteria)
            .bind(story.priority.as_str())
            .bind(story.order)
            .execute(&mut *tx)
            .await?;
        }

        for task in tasks {
            sqlx::query(
                r#"
                INSERT INTO tasks (id, spec_id, title, description, task_group, status,
                                   estimate, priority, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&spec.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.group.as_str())
            .bind(task.status.as_str())
            .bind(&task.estimate)
            .bind(task.priority.as_str())
            .bind(task.order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            spec_id = %spec.id,
            stories = stories.len(),
            tasks = tasks.len(),
            "Spec persisted"
        );
        Ok(())
    }

    async fn get_spec(&self, id: &str) -> StorageResult<Option<Spec>> {
        let row: Option<SpecRow> = sqlx::query_as(
            r#"
            SELECT id, title, template_type, goal, users, constraints,
                   risk_unknowns, generated_markdown, created_at, updated_at
            FROM specs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Spec::try_from).transpose()
    }

    async fn get_spec_detail(&self, id: &str) -> StorageResult<Option<SpecDetail>> {
        let Some(spec) = self.get_spec(id).await? else {
            return Ok(None);
        };

        let story_rows: Vec<StoryRow> = sqlx::query_as(
            r#"
            SELECT id, spec_id, story, acceptance_criteria, priority, sort_order
            FROM user_stories
            WHERE spec_id = ?
            ORDER BY sort_order ASC, rowid ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let user_stories = story_rows
            .into_iter()
            .map(UserStory::try_from)
            .collect::<StorageResult<Vec<_>>>()?;
        let tasks = self.get_spec_tasks(id).await?;

        Ok(Some(SpecDetail {
            spec,
            user_stories,
            tasks,
        }))
    }

    async fn list_recent_specs(&self, limit: u32) -> StorageResult<Vec<SpecSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, title, template_type, created_at
            FROM specs
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SpecSummary::try_from).collect()
    }

    async fn delete_spec(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM specs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SpecNotFound {
                spec_id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn get_task(&self, id: &str) -> StorageResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, spec_id, title, description, task_group, status, estimate, priority, sort_order
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Task::try_from).transpose()
    }

    async fn get_spec_tasks(&self, spec_id: &str) -> StorageResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, spec_id, title, description, task_group, status, estimate, priority, sort_order
            FROM tasks
            WHERE spec_id = ?
            ORDER BY sort_order ASC, rowid ASC
            "#,
        )
        .bind(spec_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> StorageResult<Task> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, spec_id, title, description, task_group, status, estimate, priority, sort_order
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut task = match row {
            Some(row) => Task::try_from(row)?,
            None => {
                return Err(StorageError::TaskNotFound {
                    task_id: id.to_string(),
                })
            }
        };

        if let Some(title) = &patch.title {
            let siblings: Vec<(String,)> =
                sqlx::query_as("SELECT title FROM tasks WHERE spec_id = ? AND id <> ?")
                    .bind(&task.spec_id)
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;

            let key = title_key(title);
            if siblings.iter().any(|(other,)| title_key(other) == key) {
                return Err(StorageError::DuplicateTaskTitle {
                    title: title.clone(),
                });
            }
        }

        task.apply(patch);

        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, task_group = ?, status = ?, estimate = ?, priority = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.group.as_str())
        .bind(task.status.as_str())
        .bind(&task.estimate)
        .bind(task.priority.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn apply_reorder(&self, spec_id: &str, items: &[ReorderItem]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM specs WHERE id = ?")
            .bind(spec_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorageError::SpecNotFound {
                spec_id: spec_id.to_string(),
            });
        }

        for item in items {
            let result = sqlx::query(
                r#"
                UPDATE tasks
                SET sort_order = ?, task_group = ?, status = ?
                WHERE id = ? AND spec_id = ?
                "#,
            )
            .bind(item.order)
            .bind(item.group.as_str())
            .bind(item.status.as_str())
            .bind(&item.id)
            .bind(spec_id)
            .execute(&mut *tx)
            .await?;

            // Dropping `tx` without commit rolls back the whole batch.
            if result.rows_affected() == 0 {
                return Err(StorageError::TaskNotFound {
                    task_id: item.id.clone(),
                });
            }
        }

        tx.commit().await?;

        debug!(spec_id = %spec_id, items = items.len(), "Task order persisted");
        Ok(())
    }

    async fn record_generation(&self, record: &GenerationRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO generation_history (id, spec_id, model, latency_ms, success, used_fallback,
                                            prompt_tokens, completion_tokens, total_tokens,
                                            estimated_cost_usd, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.spec_id)
        .bind(&record.model)
        .bind(record.latency_ms)
        .bind(record.success)
        .bind(record.used_fallback)
        .bind(record.prompt_tokens.map(to_i64))
        .bind(record.completion_tokens.map(to_i64))
        .bind(record.total_tokens.map(to_i64))
        .bind(record.estimated_cost_usd)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_generations(&self, spec_id: &str) -> StorageResult<Vec<GenerationRecord>> {
        let rows: Vec<GenerationRow> = sqlx::query_as(
            r#"
            SELECT id, spec_id, model, latency_ms, success, used_fallback,
                   prompt_tokens, completion_tokens, total_tokens, estimated_cost_usd, created_at
            FROM generation_history
            WHERE spec_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(spec_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GenerationRecord::try_from).collect()
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query {
            message: format!("Invalid timestamp '{}': {}", raw, e),
        })
}

fn parse_column<T: FromStr<Err = String>>(raw: &str) -> StorageResult<T> {
    raw.parse()
        .map_err(|message: String| StorageError::Query { message })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct SpecRow {
    id: String,
    title: String,
    template_type: String,
    goal: String,
    users: String,
    constraints: String,
    risk_unknowns: Option<String>,
    generated_markdown: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SpecRow> for Spec {
    type Error = StorageError;

    fn try_from(row: SpecRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            template_type: parse_column(&row.template_type)?,
            goal: row.goal,
            users: row.users,
            constraints: row.constraints,
            risk_unknowns: row.risk_unknowns,
            generated_markdown: row.generated_markdown,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    title: String,
    template_type: String,
    created_at: String,
}

impl TryFrom<SummaryRow> for SpecSummary {
    type Error = StorageError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            template_type: parse_column(&row.template_type)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StoryRow {
    id: String,
    spec_id: String,
    story: String,
    acceptance_criteria: String,
    priority: String,
    sort_order: i64,
}

impl TryFrom<StoryRow> for UserStory {
    type Error = StorageError;

    fn try_from(row: StoryRow) -> Result<Self, Self::Error> {
        let acceptance_criteria =
            serde_json::from_str(&row.acceptance_criteria).map_err(|e| StorageError::Query {
                message: format!("Invalid acceptance criteria for story {}: {}", row.id, e),
            })?;

        Ok(Self {
            id: row.id,
            spec_id: row.spec_id,
            story: row.story,
            acceptance_criteria,
            priority: parse_column(&row.priority)?,
            order: row.sort_order,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    spec_id: String,
    title: String,
    description: String,
    task_group: String,
    status: String,
    estimate: Option<String>,
    priority: String,
    sort_order: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = StorageError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            spec_id: row.spec_id,
            title: row.title,
            description: row.description,
            group: parse_column(&row.task_group)?,
            status: parse_column(&row.status)?,
            estimate: row.estimate,
            priority: parse_column(&row.priority)?,
            order: row.sort_order,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GenerationRow {
    id: String,
    spec_id: String,
    model: String,
    latency_ms: i64,
    success: bool,
    used_fallback: bool,
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    total_tokens: Option<i64>,
    estimated_cost_usd: Option<f64>,
    created_at: String,
}

impl TryFrom<GenerationRow> for GenerationRecord {
    type Error = StorageError;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        let tokens = |v: Option<i64>| v.and_then(|n| u64::try_from(n).ok());
        Ok(Self {
            id: row.id,
            spec_id: row.spec_id,
            model: row.model,
            latency_ms: row.latency_ms,
            success: row.success,
            used_fallback: row.used_fallback,
            prompt_tokens: tokens(row.prompt_tokens),
            completion_tokens: tokens(row.completion_tokens),
            total_tokens: tokens(row.total_tokens),
            estimated_cost_usd: row.estimated_cost_usd,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
