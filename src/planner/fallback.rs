//! Fixed plan substituted whenever the model cannot produce a usable one.
//!
//! Depends on nothing but the brief, so the same brief always yields the
//! same payload byte for byte.

use super::types::{
    FeatureBrief, GeneratedPayload, Priority, StoryDraft, TaskDraft, TaskGroup, TaskStatus,
};
use crate::export::build_markdown;

const FALLBACK_STORIES: [(&str, [&str; 2], Priority); 3] = [
    (
        "As an engineer, I want generated user stories so implementation can start faster.",
        [
            "Stories follow a predictable format",
            "Each story has acceptance criteria",
        ],
        Priority::High,
    ),
    (
        "As a team lead, I want grouped engineering tasks so responsibilities are clear.",
        ["Tasks include a group label", "Tasks are reorderable"],
        Priority::Medium,
    ),
    (
        "As a PM, I want export options so I can share plans quickly.",
        ["Markdown export works", "Plain text export works"],
        Priority::Medium,
    ),
];

const FALLBACK_TASKS: [(&str, &str, TaskGroup, Priority); 10] = [
    (
        "Build feature brief form",
        "Create fields for goal, users, constraints, and template.",
        TaskGroup::Frontend,
        Priority::High,
    ),
    (
        "Add form validation",
        "Use schema validation for required and length-limited fields.",
        TaskGroup::Backend,
        Priority::High,
    ),
    (
        "Implement generation API",
        "Call LLM and normalize response into stories and tasks.",
        TaskGroup::Backend,
        Priority::High,
    ),
    (
        "Create spec workspace view",
        "Show stories and editable grouped tasks.",
        TaskGroup::Frontend,
        Priority::High,
    ),
    (
        "Add task edit endpoint",
        "Allow title, description, group, status, and priority updates.",
        TaskGroup::Backend,
        Priority::Medium,
    ),
    (
        "Implement reorder endpoint",
        "Persist new order and grouping updates.",
        TaskGroup::Backend,
        Priority::Medium,
    ),
    (
        "Add export actions",
        "Support copy markdown and plain text download.",
        TaskGroup::Frontend,
        Priority::Medium,
    ),
    (
        "Build status page",
        "Check backend, database, and LLM connection states.",
        TaskGroup::Frontend,
        Priority::Medium,
    ),
    (
        "Add run history",
        "Show last five generated specs on home page.",
        TaskGroup::Frontend,
        Priority::Medium,
    ),
    (
        "Document setup",
        "Write README, AI notes, and prompt log.",
        TaskGroup::Product,
        Priority::Low,
    ),
];

/// Build the fallback payload for `brief`.
pub fn build_fallback(brief: &FeatureBrief) -> GeneratedPayload {
    let mut user_stories = vec![StoryDraft {
        story: format!(
            "As a product planner, I want to capture a feature brief so I can generate a concrete delivery plan for {}.",
            brief.goal.to_lowercase()
        ),
        acceptance_criteria: vec![
            "Form captures goal, users, and constraints".to_string(),
            "Validation blocks empty submissions".to_string(),
        ],
        priority: Priority::High,
        order: 0,
    }];

    user_stories.extend(FALLBACK_STORIES.iter().zip(1..).map(
        |((story, criteria, priority), order)| StoryDraft {
            story: story.to_string(),
            acceptance_criteria: criteria.iter().map(|c| c.to_string()).collect(),
            priority: *priority,
            order,
        },
    ));

    let tasks: Vec<TaskDraft> = FALLBACK_TASKS
        .iter()
        .zip(0..)
        .map(|((title, description, group, priority), order)| TaskDraft {
            title: title.to_string(),
            description: description.to_string(),
            group: *group,
            status: TaskStatus::Todo,
            estimate: None,
            priority: *priority,
            order,
        })
        .collect();

    let generated_markdown = build_markdown(brief, &user_stories, &tasks);

    GeneratedPayload {
        user_stories,
        tasks,
        generated_markdown,
    }
}
