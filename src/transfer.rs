//! Transfer and delegation of task responsibility.
//!
//! A transfer moves some or all pending checklist items to a receptor:
//!
//! - **Full**: every pending item is selected. The task changes hands in
//!   place and gains a closing marker plus a receipt item.
//! - **Partial**: some pending items stay behind. A new task is created
//!   for the receptor with the selected items; the original keeps the
//!   rest plus a split summary and keeps its assignee.
//!
//! Both paths append exactly one history entry to every task they touch.

use crate::error::{EngineError, EngineResult};
use crate::types::{
    ChecklistItem, Collaborator, Task, TaskStatus, TransferEntry, TransferKind,
};
use crate::workflow::{Cause, apply};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Title of the open item a receptor checks off to acknowledge receipt.
pub const RECEIPT_ITEM_TITLE: &str = "Validar recebimento da demanda";

/// How the receptor is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    /// Hand over to a team: its gestor/admin if any, else any member.
    Squad { team: String },
    /// Manager-only hand over to a named collaborator.
    Delegate { receptor_id: String },
    /// Give back to someone previously involved with the task.
    Return { receptor_id: String },
}

impl TransferMode {
    pub fn kind(&self) -> TransferKind {
        match self {
            TransferMode::Squad { .. } => TransferKind::Transfer,
            TransferMode::Delegate { .. } => TransferKind::Delegation,
            TransferMode::Return { .. } => TransferKind::Return,
        }
    }
}

/// A transfer submitted by a user.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub mode: TransferMode,
    /// Indices of pending checklist items to move.
    pub selected: BTreeSet<usize>,
    pub deadline: DateTime<Utc>,
    pub project_name: String,
}

/// Result of a transfer: the records to persist.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Full { task: Task },
    Partial { original: Task, created: Task },
}

impl TransferOutcome {
    pub fn receptor_id(&self) -> &str {
        match self {
            TransferOutcome::Full { task } => &task.assignee_id,
            TransferOutcome::Partial { created, .. } => &created.assignee_id,
        }
    }
}

/// Ids of everyone previously involved with the task: its creator and
/// every `from` party in its history, in first-seen order.
pub fn involved_ids(task: &Task) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let candidates = task
        .creator_id
        .iter()
        .cloned()
        .chain(task.transfer_history.iter().map(|e| e.from_id.clone()));
    for id in candidates {
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Collaborators the actor may return the task to.
pub fn return_candidates<'a>(
    task: &Task,
    actor: &Collaborator,
    collaborators: &'a [Collaborator],
) -> Vec<&'a Collaborator> {
    involved_ids(task)
        .into_iter()
        .filter(|id| *id != actor.id)
        .filter_map(|id| collaborators.iter().find(|c| c.id == id))
        .collect()
}

/// Resolve the receptor for a squad transfer.
pub fn squad_receptor<'a>(
    team: &str,
    collaborators: &'a [Collaborator],
) -> EngineResult<&'a Collaborator> {
    let key = crate::access::TeamKey::new(team);
    let members: Vec<&Collaborator> = collaborators
        .iter()
        .filter(|c| key.matches(&c.team_key()))
        .collect();
    members
        .iter()
        .find(|c| c.is_manager())
        .or_else(|| members.first())
        .copied()
        .ok_or_else(|| {
            EngineError::resolution(format!("Team \"{}\" has no manager and no members", team))
                .with_field("team")
        })
}

/// Resolve the receptor for any mode.
pub fn resolve_receptor<'a>(
    mode: &TransferMode,
    task: &Task,
    actor: &Collaborator,
    collaborators: &'a [Collaborator],
) -> EngineResult<&'a Collaborator> {
    match mode {
        TransferMode::Squad { team } => squad_receptor(team, collaborators),
        TransferMode::Delegate { receptor_id } => {
            if !actor.is_manager() {
                return Err(EngineError::permission_denied(
                    "Only managers can delegate tasks",
                ));
            }
            collaborators
                .iter()
                .find(|c| c.id == *receptor_id)
                .ok_or_else(|| EngineError::collaborator_not_found(receptor_id))
        }
        TransferMode::Return { receptor_id } => return_candidates(task, actor, collaborators)
            .into_iter()
            .find(|c| c.id == *receptor_id)
            .ok_or_else(|| {
                EngineError::resolution(
                    "A task can only be returned to its creator or a previous owner",
                )
                .with_field("receptor_id")
            }),
    }
}

fn party(id: &str, collaborators: &[Collaborator]) -> (String, String) {
    let name = collaborators
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string());
    (id.to_string(), name)
}

fn closed_by(title: String, (id, name): &(String, String)) -> ChecklistItem {
    ChecklistItem {
        title,
        completed: true,
        completed_by: Some(id.clone()),
        completed_by_name: Some(name.clone()),
    }
}

fn validate(task: &Task, request: &TransferRequest, now: DateTime<Utc>) -> EngineResult<()> {
    if request.deadline <= now {
        return Err(EngineError::deadline_not_in_future("deadline"));
    }
    if request.project_name.trim().is_empty() {
        return Err(EngineError::missing_field("project_name"));
    }
    if task.pending_indices().is_empty() {
        return Err(EngineError::precondition(
            "This task has no pending checklist items to transfer",
        ));
    }
    if request.selected.is_empty() {
        return Err(EngineError::precondition(
            "Select at least one pending checklist item to transfer",
        )
        .with_field("selected"));
    }
    for &index in &request.selected {
        match task.checklist.get(index) {
            None => {
                return Err(EngineError::invalid_value(
                    "selected",
                    &format!("Checklist item {} does not exist", index),
                ));
            }
            Some(item) if item.completed => {
                return Err(EngineError::invalid_value(
                    "selected",
                    &format!("\"{}\" is already completed and cannot be transferred", item.title),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Run a transfer. Pure: returns the records to persist.
pub fn transfer(
    task: &Task,
    request: &TransferRequest,
    actor: &Collaborator,
    collaborators: &[Collaborator],
    now: DateTime<Utc>,
) -> EngineResult<TransferOutcome> {
    validate(task, request, now)?;
    let receptor = resolve_receptor(&request.mode, task, actor, collaborators)?;
    if receptor.id == task.assignee_id {
        return Err(EngineError::precondition(format!(
            "{} is already responsible for this task",
            receptor.name
        )));
    }

    let from = party(&task.assignee_id, collaborators);
    let to = (receptor.id.clone(), receptor.name.clone());
    let entry = TransferEntry {
        kind: request.mode.kind(),
        from_id: from.0.clone(),
        from_name: from.1.clone(),
        to_id: to.0.clone(),
        to_name: to.1.clone(),
        date: now,
        deadline: Some(request.deadline),
        project_name: Some(request.project_name.clone()),
        notes: None,
    };

    let pending: BTreeSet<usize> = task.pending_indices().into_iter().collect();
    let full = pending.is_subset(&request.selected);
    debug!(
        task_id = %task.id,
        receptor = %receptor.id,
        selected = request.selected.len(),
        pending = pending.len(),
        full,
        "Transfer validated"
    );

    if full {
        let mut next = task.clone();
        next.assignee_id = receptor.id.clone();
        next.checklist.push(closed_by(
            format!("[TRANSFERÊNCIA] De: {} Para: {}", from.1, to.1),
            &from,
        ));
        next.checklist.push(ChecklistItem::open(RECEIPT_ITEM_TITLE));
        next.due_date = request.deadline;
        next.transfer_history.push(entry);
        apply(&mut next, Cause::ChecklistRewritten, now);

        info!(task_id = %next.id, from = %from.0, to = %to.0, "Full transfer prepared");
        return Ok(TransferOutcome::Full { task: next });
    }

    let moved = request.selected.len();

    let mut checklist = Vec::with_capacity(moved + 2);
    checklist.push(closed_by(
        format!("[ORIGEM] Transferido de \"{}\" ({})", task.title, task.id),
        &from,
    ));
    checklist.extend(request.selected.iter().map(|&i| task.checklist[i].reset()));
    checklist.push(ChecklistItem::open(RECEIPT_ITEM_TITLE));

    let mut created = Task {
        id: Uuid::now_v7().to_string(),
        title: format!("[TRANSFERIDO] {}", request.project_name.trim()),
        description: task.description.clone(),
        status: TaskStatus::Pending,
        priority: task.priority,
        assignee_id: receptor.id.clone(),
        company_id: task.company_id.clone(),
        due_date: request.deadline,
        created_at: now,
        started_at: None,
        completed_at: None,
        creator_id: Some(actor.id.clone()),
        faq_id: task.faq_id.clone(),
        reminder: None,
        checklist,
        repeat_frequency: Default::default(),
        attachment_url: None,
        notes: None,
        is_replicated: false,
        transfer_history: task.transfer_history.appended(entry.clone()),
        due_notification_sent: false,
        last_notification_date: None,
    };
    apply(&mut created, Cause::ChecklistRewritten, now);

    let mut original = task.clone();
    original.checklist = task
        .checklist
        .iter()
        .enumerate()
        .filter(|(i, _)| !request.selected.contains(i))
        .map(|(_, item)| item.clone())
        .collect();
    original.checklist.push(closed_by(
        format!("[SPLIT] {} itens transferidos para {}", moved, to.1),
        &from,
    ));
    original.transfer_history.push(TransferEntry {
        project_name: Some(format!(
            "{} (SPLIT: {} itens)",
            request.project_name.trim(),
            moved
        )),
        ..entry
    });
    apply(&mut original, Cause::ChecklistRewritten, now);

    info!(
        task_id = %original.id,
        new_task_id = %created.id,
        moved,
        to = %to.0,
        "Partial transfer prepared"
    );
    Ok(TransferOutcome::Partial { original, created })
}
