//! Checklist toggling.

use super::{Cause, apply};
use crate::error::{EngineError, EngineResult};
use crate::types::{Collaborator, Task};
use chrono::{DateTime, Utc};

/// Toggle checklist item `index` on behalf of `actor`.
///
/// Returns the updated task; the input is left untouched so the caller
/// can persist first and merge afterwards. A completed item can only be
/// un-completed by the collaborator recorded as its completer.
pub fn toggle_item(
    task: &Task,
    index: usize,
    actor: &Collaborator,
    now: DateTime<Utc>,
) -> EngineResult<Task> {
    let item = task.checklist.get(index).ok_or_else(|| {
        EngineError::invalid_value(
            "index",
            &format!(
                "Checklist item {} does not exist (task has {} items)",
                index,
                task.checklist.len()
            ),
        )
    })?;

    if item.completed
        && let Some(owner) = item.completed_by.as_deref()
        && owner != actor.id
    {
        let who = item.completed_by_name.as_deref().unwrap_or(owner);
        return Err(EngineError::permission_denied(format!(
            "Only {} can reopen \"{}\"",
            who, item.title
        )));
    }

    let mut next = task.clone();
    let entry = &mut next.checklist[index];
    entry.completed = !entry.completed;
    if entry.completed {
        entry.completed_by = Some(actor.id.clone());
        entry.completed_by_name = Some(actor.name.clone());
    } else {
        entry.completed_by = None;
        entry.completed_by_name = None;
    }

    apply(&mut next, Cause::ChecklistToggle, now);
    Ok(next)
}
