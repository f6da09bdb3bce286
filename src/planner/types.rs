use serde::{Deserialize, Serialize};

use crate::llm::TokenUsage;

/// Kind of product the brief describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    WebApp,
    MobileApp,
    InternalTool,
}

impl TemplateType {
    /// Wire name, e.g. `"web_app"`
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::WebApp => "web_app",
            TemplateType::MobileApp => "mobile_app",
            TemplateType::InternalTool => "internal_tool",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_app" => Ok(TemplateType::WebApp),
            "mobile_app" => Ok(TemplateType::MobileApp),
            "internal_tool" => Ok(TemplateType::InternalTool),
            _ => Err(format!("Unknown template type: {}", s)),
        }
    }
}

/// Story and task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// Ownership category of a task; also the reorder partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskGroup {
    Frontend,
    Backend,
    Qa,
    Devops,
    Product,
    Unknown,
}

impl TaskGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskGroup::Frontend => "frontend",
            TaskGroup::Backend => "backend",
            TaskGroup::Qa => "qa",
            TaskGroup::Devops => "devops",
            TaskGroup::Product => "product",
            TaskGroup::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frontend" => Ok(TaskGroup::Frontend),
            "backend" => Ok(TaskGroup::Backend),
            "qa" => Ok(TaskGroup::Qa),
            "devops" => Ok(TaskGroup::Devops),
            "product" => Ok(TaskGroup::Product),
            "unknown" => Ok(TaskGroup::Unknown),
            _ => Err(format!("Unknown task group: {}", s)),
        }
    }
}

/// Progress state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Validated generation input. Construct through
/// [`crate::validation::validate_brief`] so that every field is trimmed
/// and within bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBrief {
    pub title: String,
    pub template_type: TemplateType,
    pub goal: String,
    pub users: String,
    pub constraints: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_unknowns: Option<String>,
}

/// A generated user story before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    pub story: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
    pub order: i64,
}

/// A generated task before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub group: TaskGroup,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    pub priority: Priority,
    pub order: i64,
}

/// Stories and tasks plus their rendered markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPayload {
    pub user_stories: Vec<StoryDraft>,
    pub tasks: Vec<TaskDraft>,
    pub generated_markdown: String,
}

/// How a payload was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub model: String,
    pub used_fallback: bool,
    pub usage: TokenUsage,
    pub estimated_cost_usd: Option<f64>,
}

/// Output of [`super::Generator::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(flatten)]
    pub payload: GeneratedPayload,
    pub meta: GenerationMeta,
}
