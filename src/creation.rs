//! Task creation, replication and edits.
//!
//! One submission expands to `drafts × companies × assignees` records:
//! companies default to a single company-less pass, and assignees are
//! either the chosen collaborator or, when replicating, every visible
//! team member.

use crate::error::{EngineError, EngineResult};
use crate::types::{
    ChecklistItem, Collaborator, RepeatFrequency, Task, TaskPriority, TaskStatus, TemplateTask,
    TransferEntry, TransferHistory, TransferKind,
};
use crate::workflow::{Cause, apply, status::check_status_change};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// User-editable task fields, as submitted by a form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub faq_id: Option<String>,
    /// Checklist item titles.
    #[serde(default)]
    pub checklist: Vec<String>,
    #[serde(default)]
    pub repeat_frequency: RepeatFrequency,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A template task and the ids of the activities picked from it.
#[derive(Debug, Clone)]
pub struct TemplateSelection {
    pub task: TemplateTask,
    pub activity_ids: Vec<String>,
}

/// How drafts are turned into records.
#[derive(Debug, Clone, Default)]
pub enum CreationMode {
    #[default]
    Standard,
    /// Pending, checklist-less, `reminder` = due date, no repetition.
    Reminder,
    /// Checklist built from template selections.
    Template(Vec<TemplateSelection>),
}

/// One create submission.
#[derive(Debug, Clone, Default)]
pub struct CreationRequest {
    pub drafts: Vec<TaskDraft>,
    pub company_ids: Vec<String>,
    pub replicate_to_all_members: bool,
    pub mode: CreationMode,
}

/// Checklist for a template creation: each selected template task's title
/// as a header item followed by its selected activities, all open.
pub fn template_checklist(selections: &[TemplateSelection]) -> Vec<String> {
    let mut titles = Vec::new();
    for selection in selections {
        titles.push(selection.task.title.clone());
        titles.extend(
            selection
                .task
                .activities
                .iter()
                .filter(|a| selection.activity_ids.contains(&a.id))
                .map(|a| a.title.clone()),
        );
    }
    titles
}

/// Apply mode-specific shaping to a draft.
fn shape_draft(draft: &TaskDraft, mode: &CreationMode) -> TaskDraft {
    let mut shaped = draft.clone();
    match mode {
        CreationMode::Standard => {}
        CreationMode::Reminder => {
            shaped.status = TaskStatus::Pending;
            shaped.checklist.clear();
            shaped.repeat_frequency = RepeatFrequency::None;
        }
        CreationMode::Template(selections) => {
            shaped.checklist = template_checklist(selections);
            if shaped.title.trim().is_empty() {
                shaped.title = selections
                    .iter()
                    .map(|s| s.task.title.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ");
            }
            if shaped.description.trim().is_empty()
                && let [only] = selections.as_slice()
            {
                shaped.description = only.task.description.clone();
            }
        }
    }
    shaped
}

fn validate_draft(draft: &TaskDraft, now: DateTime<Utc>) -> EngineResult<DateTime<Utc>> {
    if draft.title.trim().is_empty() {
        return Err(EngineError::missing_field("title"));
    }
    let due = draft
        .due_date
        .ok_or_else(|| EngineError::missing_field("due_date"))?;
    if due <= now {
        return Err(EngineError::deadline_not_in_future("due_date"));
    }
    Ok(due)
}

fn find<'a>(collaborators: &'a [Collaborator], id: &str) -> EngineResult<&'a Collaborator> {
    collaborators
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| EngineError::collaborator_not_found(id))
}

/// Expand a create submission into task records. Pure: nothing is
/// persisted, and an error means no record was produced at all.
///
/// `team_members` is the acting user's visible collaborator set, used
/// when replicating.
pub fn create_tasks(
    request: &CreationRequest,
    actor: &Collaborator,
    team_members: &[Collaborator],
    collaborators: &[Collaborator],
    now: DateTime<Utc>,
) -> EngineResult<Vec<Task>> {
    if request.drafts.is_empty() {
        return Err(EngineError::precondition("Nothing to create"));
    }

    let companies: Vec<Option<String>> = if request.company_ids.is_empty() {
        vec![None]
    } else {
        request.company_ids.iter().cloned().map(Some).collect()
    };

    let mut records = Vec::new();
    for draft in &request.drafts {
        let draft = shape_draft(draft, &request.mode);
        let due = validate_draft(&draft, now)?;

        let assignees: Vec<&Collaborator> = if request.replicate_to_all_members {
            if team_members.is_empty() {
                return Err(EngineError::precondition(
                    "There are no team members to replicate this task to",
                ));
            }
            team_members.iter().collect()
        } else {
            let id = draft
                .assignee_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| EngineError::missing_field("assignee_id"))?;
            vec![find(collaborators, id)?]
        };

        for company_id in &companies {
            for assignee in &assignees {
                let mut task =
                    materialize(&draft, due, company_id.clone(), assignee, actor, request, now);
                settle_initial_status(&mut task, draft.status, actor, now)?;
                records.push(task);
            }
        }
    }

    debug!(
        count = records.len(),
        replicated = request.replicate_to_all_members,
        "Create request expanded"
    );
    Ok(records)
}

fn materialize(
    draft: &TaskDraft,
    due: DateTime<Utc>,
    company_id: Option<String>,
    assignee: &Collaborator,
    actor: &Collaborator,
    request: &CreationRequest,
    now: DateTime<Utc>,
) -> Task {
    let reminder = matches!(request.mode, CreationMode::Reminder).then_some(due);
    Task {
        id: Uuid::now_v7().to_string(),
        title: draft.title.trim().to_string(),
        description: draft.description.clone(),
        status: TaskStatus::Pending,
        priority: draft.priority,
        assignee_id: assignee.id.clone(),
        company_id,
        due_date: due,
        created_at: now,
        started_at: None,
        completed_at: None,
        creator_id: Some(actor.id.clone()),
        faq_id: draft.faq_id.clone(),
        reminder,
        checklist: draft.checklist.iter().map(ChecklistItem::open).collect(),
        repeat_frequency: draft.repeat_frequency,
        attachment_url: draft.attachment_url.clone(),
        notes: draft.notes.clone(),
        is_replicated: request.replicate_to_all_members,
        transfer_history: TransferHistory::new().appended(TransferEntry::new(
            TransferKind::Creation,
            actor,
            assignee,
            now,
        )),
        due_notification_sent: false,
        last_notification_date: None,
    }
}

/// Move a freshly built Pending task to the requested status.
///
/// The request goes through the same guard as a direct status change. A
/// non-terminal status on a task with a checklist is then re-derived from
/// the checklist, which at creation has no completed items.
fn settle_initial_status(
    task: &mut Task,
    requested: TaskStatus,
    actor: &Collaborator,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    check_status_change(task, requested, actor)?;
    apply(task, Cause::ExplicitSet(requested), now);
    if !requested.is_terminal() && task.total_count() > 0 {
        apply(task, Cause::ChecklistRewritten, now);
    }
    Ok(())
}

/// Carry completion over to an edited checklist: each title reuses the
/// first not-yet-claimed existing item with the same title.
fn merge_checklist(existing: &[ChecklistItem], titles: &[String]) -> Vec<ChecklistItem> {
    let mut claimed = vec![false; existing.len()];
    titles
        .iter()
        .map(|title| {
            let reuse = existing
                .iter()
                .enumerate()
                .find(|(i, item)| !claimed[*i] && item.title == *title);
            match reuse {
                Some((i, item)) => {
                    claimed[i] = true;
                    item.clone()
                }
                None => ChecklistItem::open(title.clone()),
            }
        })
        .collect()
}

/// Apply an edit to an existing task. Pure: returns the updated record.
pub fn edit_task(
    existing: &Task,
    draft: &TaskDraft,
    company_id: Option<String>,
    actor: &Collaborator,
    collaborators: &[Collaborator],
    now: DateTime<Utc>,
) -> EngineResult<Task> {
    let due = validate_draft(draft, now)?;

    let mut next = existing.clone();
    next.title = draft.title.trim().to_string();
    next.description = draft.description.clone();
    next.priority = draft.priority;
    if due != existing.due_date {
        next.due_notification_sent = false;
        next.last_notification_date = None;
    }
    next.due_date = due;
    next.faq_id = draft.faq_id.clone();
    next.attachment_url = draft.attachment_url.clone();
    next.notes = draft.notes.clone();
    next.company_id = company_id;
    if let Some(assignee_id) = draft.assignee_id.as_deref().filter(|id| !id.is_empty()) {
        next.assignee_id = find(collaborators, assignee_id)?.id.clone();
    }
    if existing.is_reminder() {
        next.reminder = Some(due);
        next.repeat_frequency = RepeatFrequency::None;
    } else {
        next.repeat_frequency = draft.repeat_frequency;
    }

    let checklist_changed = existing.checklist.len() != draft.checklist.len()
        || existing
            .checklist
            .iter()
            .zip(&draft.checklist)
            .any(|(item, title)| item.title != *title);
    if checklist_changed {
        next.checklist = merge_checklist(&existing.checklist, &draft.checklist);
    }

    if draft.status != existing.status {
        check_status_change(&next, draft.status, actor)?;
        apply(&mut next, Cause::ExplicitSet(draft.status), now);
        if draft.status == TaskStatus::Done {
            let assignee = find(collaborators, &next.assignee_id).unwrap_or(actor);
            next.transfer_history.push(TransferEntry::new(
                TransferKind::Completion,
                actor,
                assignee,
                now,
            ));
        }
    } else if checklist_changed {
        apply(&mut next, Cause::ChecklistRewritten, now);
    }

    Ok(next)
}
