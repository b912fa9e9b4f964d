//! Guard for direct status updates (drag-and-drop, explicit edits).

use super::{Cause, apply};
use crate::error::{EngineError, EngineResult};
use crate::types::{Collaborator, Task, TaskStatus};
use chrono::{DateTime, Utc};

/// Check that `actor` may move `task` to `target`.
pub fn check_status_change(
    task: &Task,
    target: TaskStatus,
    actor: &Collaborator,
) -> EngineResult<()> {
    if target.is_terminal() && !actor.is_manager() {
        return Err(EngineError::permission_denied(format!(
            "Only managers can move a task to \"{}\"",
            target.as_str()
        ))
        .with_field("status"));
    }

    if target == TaskStatus::InProgress
        && task.total_count() > 0
        && task.completed_count() == 0
    {
        return Err(EngineError::precondition(
            "Complete at least one checklist item before starting this task",
        )
        .with_field("status"));
    }

    Ok(())
}

/// Validate and apply a direct status update, returning the updated task.
pub fn set_status(
    task: &Task,
    target: TaskStatus,
    actor: &Collaborator,
    now: DateTime<Utc>,
) -> EngineResult<Task> {
    check_status_change(task, target, actor)?;
    let mut next = task.clone();
    apply(&mut next, Cause::ExplicitSet(target), now);
    Ok(next)
}
