use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Spec not found: {spec_id}")]
    SpecNotFound { spec_id: String },

    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Duplicate task title: {title}")]
    DuplicateTaskTitle { title: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Chat-completion provider errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("LLM HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("LLM returned an empty message")]
    EmptyResponse,

    #[error("LLM credential is not configured")]
    MissingCredential,

    #[error("Malformed model output: {message}")]
    MalformedOutput { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Input validation failure carrying every offending field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{summary}")]
pub struct ValidationError {
    pub summary: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Create an empty validation error with the given summary
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            issues: Vec::new(),
        }
    }

    /// Record an issue against a field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Single-issue shorthand
    pub fn field(
        summary: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(summary);
        err.push(field, message);
        err
    }

    /// `Ok(())` when no issues were recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl AppError {
    /// Not-found shorthand for a spec id
    pub fn spec_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: "Spec",
            id: id.into(),
        }
    }

    /// Not-found shorthand for a task id
    pub fn task_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: "Task",
            id: id.into(),
        }
    }

    /// Lift storage not-found variants into [`AppError::NotFound`].
    pub fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::SpecNotFound { spec_id } => AppError::spec_not_found(spec_id),
            StorageError::TaskNotFound { task_id } => AppError::task_not_found(task_id),
            StorageError::DuplicateTaskTitle { .. } => AppError::Validation(ValidationError::field(
                "Invalid task update.",
                "title",
                "Another task in this spec already uses this title.",
            )),
            other => AppError::Storage(other),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
