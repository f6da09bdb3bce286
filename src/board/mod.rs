//! Task board reorder engine.
//!
//! Tasks carry one global `order` per spec, but the board shows them
//! partitioned by [`TaskGroup`]. A drag moves one task inside one group;
//! every other group keeps the exact slots it had.

pub mod optimistic;

pub use optimistic::{apply_and_confirm, OptimisticEdit, TaskBoard};

use crate::planner::TaskGroup;
use crate::storage::{ReorderItem, Task};

/// Move `source_id` onto `target_id`'s position inside `group`.
///
/// Returns the whole task list with dense `order` values, or `None` when
/// the drag changes nothing: same source and target, or either id not in
/// `group`. A source from another group is not found and is a no-op.
pub fn reorder_within_group(
    tasks: &[Task],
    source_id: &str,
    target_id: &str,
    group: TaskGroup,
) -> Option<Vec<Task>> {
    if source_id == target_id {
        return None;
    }

    let mut ordered = sorted_by_order(tasks);

    let slots: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, task)| task.group == group)
        .map(|(idx, _)| idx)
        .collect();

    let mut members: Vec<Task> = slots.iter().map(|&idx| ordered[idx].clone()).collect();
    let source = members.iter().position(|t| t.id == source_id)?;
    let target = members.iter().position(|t| t.id == target_id)?;

    let moved = members.remove(source);
    members.insert(target, moved);

    for (slot, task) in slots.into_iter().zip(members) {
        ordered[slot] = task;
    }

    for (idx, task) in ordered.iter_mut().enumerate() {
        task.order = idx as i64;
    }

    Some(ordered)
}

/// Reorder batch for every task, in list order.
pub fn reorder_items(tasks: &[Task]) -> Vec<ReorderItem> {
    tasks.iter().map(Task::reorder_item).collect()
}

/// Reorder batch that renumbers tasks densely by their current position.
pub fn dense_reorder_items(tasks: &[Task]) -> Vec<ReorderItem> {
    sorted_by_order(tasks)
        .iter()
        .enumerate()
        .map(|(idx, task)| ReorderItem {
            order: idx as i64,
            ..task.reorder_item()
        })
        .collect()
}

/// Board columns: each group with its tasks by `order`, groups in order
/// of first appearance.
pub fn group_tasks(tasks: &[Task]) -> Vec<(TaskGroup, Vec<Task>)> {
    let mut groups: Vec<(TaskGroup, Vec<Task>)> = Vec::new();
    for task in sorted_by_order(tasks) {
        match groups.iter_mut().find(|(group, _)| *group == task.group) {
            Some((_, members)) => members.push(task),
            None => groups.push((task.group, vec![task])),
        }
    }
    groups
}

/// Stable sort, so equal `order` values keep their input sequence.
fn sorted_by_order(tasks: &[Task]) -> Vec<Task> {
    let mut ordered = tasks.to_vec();
    ordered.sort_by_key(|t| t.order);
    ordered
}
