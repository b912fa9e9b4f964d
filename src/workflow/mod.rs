//! Task state transitions.
//!
//! Checklist toggles, explicit status changes and checklist rewrites (from
//! transfers) all land in [`apply`], so the timestamp invariants live in
//! one place:
//!
//! - `completed_at` is set iff status is Done.
//! - `started_at` is set when work starts and cleared when a checklist
//!   drops back to zero completed items.
//! - A non-empty checklist determines status whenever it changes.

pub mod checklist;
pub mod status;

pub use checklist::toggle_item;
pub use status::set_status;

use crate::types::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use tracing::debug;

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// A checklist item was toggled.
    ChecklistToggle,
    /// The checklist was rewritten wholesale (transfer, split).
    ChecklistRewritten,
    /// A direct status update, already authorized by the status guard.
    ExplicitSet(TaskStatus),
}

/// Status implied by checklist counts. `None` for an empty checklist.
pub fn derived_status(task: &Task) -> Option<TaskStatus> {
    let total = task.total_count();
    if total == 0 {
        return None;
    }
    let completed = task.completed_count();
    Some(if completed == total {
        TaskStatus::Review
    } else if completed == 0 {
        TaskStatus::Pending
    } else {
        TaskStatus::InProgress
    })
}

/// Apply a transition in place and return the resulting status.
pub fn apply(task: &mut Task, cause: Cause, now: DateTime<Utc>) -> TaskStatus {
    let previous = task.status;

    match cause {
        Cause::ChecklistToggle | Cause::ChecklistRewritten => {
            let Some(next) = derived_status(task) else {
                return task.status;
            };
            task.status = next;
            match next {
                TaskStatus::Review => {
                    task.completed_at = None;
                }
                TaskStatus::Pending => {
                    task.started_at = None;
                    task.completed_at = None;
                }
                _ => {
                    task.completed_at = None;
                    if task.started_at.is_none() {
                        task.started_at = Some(now);
                    }
                }
            }
        }
        Cause::ExplicitSet(next) => {
            task.status = next;
            if next == TaskStatus::InProgress && task.started_at.is_none() {
                task.started_at = Some(now);
            }
            if next == TaskStatus::Done {
                task.completed_at = Some(now);
            } else {
                task.completed_at = None;
            }
        }
    }

    debug!(
        task_id = %task.id,
        from = previous.as_str(),
        to = task.status.as_str(),
        ?cause,
        "Task transition applied"
    );
    task.status
}
