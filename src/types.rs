//! Core types for the squad task board.
//!
//! In-memory records serialize with camelCase field names; the store
//! boundary renames them to snake_case (see `db::records`).

use crate::access::{AccessLevel, TeamKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task status. Wire values are the labels the backing store holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Pendente", alias = "Pending")]
    Pending,
    #[serde(rename = "Em Andamento", alias = "InProgress")]
    InProgress,
    #[serde(rename = "Em Revisão", alias = "Review")]
    Review,
    #[serde(rename = "Concluído", alias = "Done")]
    Done,
    #[serde(rename = "Arquivado", alias = "Archived")]
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pendente",
            TaskStatus::InProgress => "Em Andamento",
            TaskStatus::Review => "Em Revisão",
            TaskStatus::Done => "Concluído",
            TaskStatus::Archived => "Arquivado",
        }
    }

    /// Parse either the store label or the English name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        TaskStatus::ALL.into_iter().find(|status| {
            status.as_str().to_lowercase() == needle
                || format!("{:?}", status).to_lowercase() == needle.replace(['_', '-', ' '], "")
        })
    }

    /// Done and Archived may only be entered by a manager.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Archived)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    #[serde(rename = "Baixa", alias = "Low")]
    Low,
    #[default]
    #[serde(rename = "Média", alias = "Medium")]
    Medium,
    #[serde(rename = "Alta", alias = "High")]
    High,
    #[serde(rename = "Crítica", alias = "Critical")]
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Baixa",
            TaskPriority::Medium => "Média",
            TaskPriority::High => "Alta",
            TaskPriority::Critical => "Crítica",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "baixa" | "low" => Some(TaskPriority::Low),
            "média" | "media" | "medium" => Some(TaskPriority::Medium),
            "alta" | "high" => Some(TaskPriority::High),
            "crítica" | "critica" | "critical" => Some(TaskPriority::Critical),
            _ => None,
        }
    }
}

/// Calendar repetition. Only affects the agenda projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatFrequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

/// A member of the organization. `role` doubles as job title and team key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default = "default_allowed")]
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default)]
    pub must_change_password: bool,
}

fn default_allowed() -> bool {
    true
}

impl Collaborator {
    pub fn team_key(&self) -> TeamKey {
        TeamKey::new(&self.role)
    }

    pub fn is_manager(&self) -> bool {
        self.access_level.is_manager()
    }

    pub fn is_admin(&self) -> bool {
        self.access_level.is_admin()
    }

    /// Same team as another collaborator.
    pub fn shares_team_with(&self, other: &Collaborator) -> bool {
        self.team_key().matches(&other.team_key())
    }
}

/// A client company, visible to one or more teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Display color or logo reference.
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub team: Vec<String>,
}

impl Company {
    pub fn is_visible_to_team(&self, key: &TeamKey) -> bool {
        self.team.iter().any(|t| key.matches_raw(t))
    }
}

/// A knowledge-base entry tasks can link to through `faq_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer: String,
    /// External documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
}

/// One checklist line on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by_name: Option<String>,
}

impl ChecklistItem {
    pub fn open(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            completed_by: None,
            completed_by_name: None,
        }
    }

    /// An item that is already completed and attributed to `by`.
    pub fn closed(title: impl Into<String>, by: &Collaborator) -> Self {
        Self {
            title: title.into(),
            completed: true,
            completed_by: Some(by.id.clone()),
            completed_by_name: Some(by.name.clone()),
        }
    }

    /// Same title, reset to pending with no attribution.
    pub fn reset(&self) -> Self {
        Self::open(self.title.clone())
    }
}

/// Kind of responsibility change recorded in a task's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    #[serde(rename = "criacao")]
    Creation,
    #[serde(rename = "transferencia")]
    Transfer,
    #[serde(rename = "delegacao")]
    Delegation,
    #[serde(rename = "devolucao")]
    Return,
    #[serde(rename = "finalizacao")]
    Completion,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Creation => "criacao",
            TransferKind::Transfer => "transferencia",
            TransferKind::Delegation => "delegacao",
            TransferKind::Return => "devolucao",
            TransferKind::Completion => "finalizacao",
        }
    }
}

/// One entry in a task's transfer history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEntry {
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub from_id: String,
    pub from_name: String,
    pub to_id: String,
    pub to_name: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TransferEntry {
    pub fn new(
        kind: TransferKind,
        from: &Collaborator,
        to: &Collaborator,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            from_id: from.id.clone(),
            from_name: from.name.clone(),
            to_id: to.id.clone(),
            to_name: to.name.clone(),
            date,
            deadline: None,
            project_name: None,
            notes: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = Some(project_name.into());
        self
    }
}

/// Append-only audit trail of responsibility changes.
///
/// Entries can be read and appended; there is no way to reach an
/// existing entry mutably or to remove one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferHistory(Vec<TransferEntry>);

impl TransferHistory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, entry: TransferEntry) {
        self.0.push(entry);
    }

    /// A copy of this history with one more entry.
    pub fn appended(&self, entry: TransferEntry) -> Self {
        let mut next = self.clone();
        next.push(entry);
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransferEntry> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&TransferEntry> {
        self.0.last()
    }

    pub fn as_slice(&self) -> &[TransferEntry] {
        &self.0
    }

    /// True if `earlier` is a prefix of this history.
    pub fn extends(&self, earlier: &TransferHistory) -> bool {
        self.0.len() >= earlier.0.len() && self.0[..earlier.0.len()] == earlier.0[..]
    }
}

impl<'a> IntoIterator for &'a TransferHistory {
    type Item = &'a TransferEntry;
    type IntoIter = std::slice::Iter<'a, TransferEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A task on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assignee_id: String,
    /// None for company-less reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub repeat_frequency: RepeatFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_replicated: bool,
    #[serde(default)]
    pub transfer_history: TransferHistory,
    /// Set once an overdue notice has gone out.
    #[serde(default)]
    pub due_notification_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notification_date: Option<DateTime<Utc>>,
}

impl Task {
    /// A task with a reminder timestamp.
    pub fn is_reminder(&self) -> bool {
        self.reminder.is_some()
    }

    pub fn completed_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.completed).count()
    }

    pub fn total_count(&self) -> usize {
        self.checklist.len()
    }

    /// Indices of checklist items not yet completed, in order.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.checklist
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.completed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.due_date < now
    }

    pub fn is_involved(&self, collaborator_id: &str) -> bool {
        self.assignee_id == collaborator_id || self.creator_id.as_deref() == Some(collaborator_id)
    }
}

/// A reusable task template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<TemplateTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTask {
    pub id: String,
    pub template_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub activities: Vec<TemplateActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateActivity {
    pub id: String,
    pub template_task_id: String,
    pub title: String,
}

/// Activity-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub action: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}
