//! Local task board state with optimistic edits.
//!
//! Field edits are applied locally first and undone if the remote update
//! fails. Drags are different: the new order only replaces local state
//! after it has been persisted.

use std::future::Future;
use tracing::{debug, warn};

use super::{dense_reorder_items, group_tasks, reorder_within_group};
use crate::error::{AppError, AppResult};
use crate::planner::TaskGroup;
use crate::storage::{ReorderItem, Task, TaskPatch};

/// In-memory copy of one spec's tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Board columns, see [`group_tasks`].
    pub fn columns(&self) -> Vec<(TaskGroup, Vec<Task>)> {
        group_tasks(&self.tasks)
    }

    /// Replace a task with the authoritative copy, e.g. a server response.
    pub fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    /// Full dense order of the board, for re-saving after a group or
    /// status edit.
    pub fn layout_items(&self) -> Vec<ReorderItem> {
        dense_reorder_items(&self.tasks)
    }

    /// Drag `source_id` onto `target_id` within `group`.
    ///
    /// `persist` receives the full reorder batch. Local state changes only
    /// when it succeeds. Returns `Ok(false)` for a no-op drag.
    pub async fn move_task<F, Fut, E>(
        &mut self,
        source_id: &str,
        target_id: &str,
        group: TaskGroup,
        persist: F,
    ) -> Result<bool, E>
    where
        F: FnOnce(Vec<ReorderItem>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let Some(reordered) = reorder_within_group(&self.tasks, source_id, target_id, group) else {
            debug!(source_id, target_id, group = %group, "Drag is a no-op");
            return Ok(false);
        };

        persist(super::reorder_items(&reordered)).await?;
        self.tasks = reordered;
        Ok(true)
    }
}

/// Guard for a speculative task patch. Dropping it without
/// [`OptimisticEdit::confirm`] restores the snapshot.
#[derive(Debug)]
pub struct OptimisticEdit<'a> {
    board: &'a mut TaskBoard,
    snapshot: Option<Vec<Task>>,
}

impl<'a> OptimisticEdit<'a> {
    /// Snapshot the board and apply `patch` to `task_id` locally.
    pub fn apply(board: &'a mut TaskBoard, task_id: &str, patch: &TaskPatch) -> AppResult<Self> {
        let snapshot = board.tasks.clone();
        let task = board
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| AppError::task_not_found(task_id))?;
        task.apply(patch);

        Ok(Self {
            board,
            snapshot: Some(snapshot),
        })
    }

    /// The board as currently shown, with the edit applied.
    pub fn board(&self) -> &TaskBoard {
        self.board
    }

    /// Keep the edit.
    pub fn confirm(mut self) {
        self.snapshot = None;
    }

    /// Restore the tasks as they were before [`OptimisticEdit::apply`].
    pub fn rollback(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.board.tasks = snapshot;
        }
    }
}

impl Drop for OptimisticEdit<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Apply `patch` locally, run `remote`, then confirm or roll back.
///
/// On success the returned task replaces the local copy.
pub async fn apply_and_confirm<F, Fut>(
    board: &mut TaskBoard,
    task_id: &str,
    patch: TaskPatch,
    remote: F,
) -> AppResult<Task>
where
    F: FnOnce(String, TaskPatch) -> Fut,
    Fut: Future<Output = AppResult<Task>>,
{
    let edit = OptimisticEdit::apply(board, task_id, &patch)?;

    match remote(task_id.to_string(), patch).await {
        Ok(task) => {
            edit.confirm();
            board.upsert(task.clone());
            Ok(task)
        }
        Err(e) => {
            warn!(task_id, error = %e, "Task update failed, restoring previous state");
            edit.rollback();
            Err(e)
        }
    }
}
