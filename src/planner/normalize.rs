use std::collections::HashSet;

use super::extract::RawPayload;
use super::types::{StoryDraft, TaskDraft};

/// Most stories kept from a model payload.
pub const MAX_STORIES: usize = 8;
/// Most acceptance criteria kept per story.
pub const MAX_CRITERIA: usize = 5;
/// Most tasks kept from a model payload.
pub const MAX_TASKS: usize = 20;
/// Fewest stories a payload may have before the fallback replaces it.
pub const MIN_STORIES: usize = 4;
/// Fewest tasks a payload may have before the fallback replaces it.
pub const MIN_TASKS: usize = 8;

/// Key under which two task titles are considered the same.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Trim, cap, dedupe and order a model payload.
pub fn normalize(raw: RawPayload) -> (Vec<StoryDraft>, Vec<TaskDraft>) {
    let stories = raw
        .user_stories
        .into_iter()
        .take(MAX_STORIES)
        .enumerate()
        .map(|(idx, story)| StoryDraft {
            story: story.story.trim().to_string(),
            acceptance_criteria: story
                .acceptance_criteria
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .take(MAX_CRITERIA)
                .map(str::to_string)
                .collect(),
            priority: story.priority,
            order: idx as i64,
        })
        .collect();

    let mut seen = HashSet::new();
    let tasks = raw
        .tasks
        .into_iter()
        .filter(|task| {
            let key = title_key(&task.title);
            !key.is_empty() && seen.insert(key)
        })
        .take(MAX_TASKS)
        .enumerate()
        .map(|(idx, task)| TaskDraft {
            title: task.title.trim().to_string(),
            description: task.description.trim().to_string(),
            group: task.group,
            status: task.status,
            estimate: task
                .estimate
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            priority: task.priority,
            order: idx as i64,
        })
        .collect();

    (stories, tasks)
}

/// Whether a normalized payload clears the guaranteed minimums.
pub fn meets_minimums(stories: &[StoryDraft], tasks: &[TaskDraft]) -> bool {
    stories.len() >= MIN_STORIES && tasks.len() >= MIN_TASKS
}
