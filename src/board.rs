//! A user's session over the board.
//!
//! The board caches every record set, runs engine operations against the
//! cache, persists their output and only then merges it locally. A
//! rejected operation never reaches the store; a failed write leaves the
//! cache exactly as it was.

use crate::access::{AccessLevel, dedup_teams};
use crate::activity::{ActivityEvent, ActivityLog};
use crate::config::Config;
use crate::creation::{self, CreationRequest, TaskDraft};
use crate::db::{Store, records};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{self, BoardMetrics};
use crate::transfer::{self, TransferOutcome, TransferRequest};
use crate::overdue;
use crate::types::{Collaborator, Company, Faq, Task, TaskStatus, TaskTemplate};
use crate::visibility::{self, VisibleSet};
use crate::workflow;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Bucket for task attachments.
pub const ATTACHMENT_BUCKET: &str = "task-attachments";

/// Admin-editable collaborator fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CollaboratorUpdate {
    pub role: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub allowed: Option<bool>,
}

pub struct Board {
    store: Arc<dyn Store>,
    user: Collaborator,
    tasks: Vec<Task>,
    companies: Vec<Company>,
    collaborators: Vec<Collaborator>,
    templates: Vec<TaskTemplate>,
    faqs: Vec<Faq>,
    activity: ActivityLog,
}

fn persisted<T>(operation: &str, result: anyhow::Result<T>) -> EngineResult<T> {
    result.map_err(|e| {
        let err = EngineError::from(e);
        warn!(operation, error = %err, "Persistence failed; local state unchanged");
        err
    })
}

fn checked<T>(operation: &str, result: EngineResult<T>) -> EngineResult<T> {
    if let Err(e) = &result {
        warn!(operation, code = ?e.code, error = %e, "Rejected");
    }
    result
}

impl Board {
    /// Load every record set and open a session for `user_id`.
    pub fn load(store: Arc<dyn Store>, user_id: &str, config: &Config) -> EngineResult<Self> {
        let collaborators: Vec<Collaborator> =
            persisted("load", records::load_all(store.as_ref()))?;
        let user = collaborators
            .iter()
            .find(|c| c.id == user_id)
            .cloned()
            .ok_or_else(|| EngineError::collaborator_not_found(user_id))?;
        if !user.allowed {
            return Err(EngineError::permission_denied(format!(
                "{} is not allowed to use the board",
                user.name
            )));
        }

        let tasks = persisted("load", records::load_all(store.as_ref()))?;
        let companies = persisted("load", records::load_all(store.as_ref()))?;
        let templates = persisted("load", records::load_all(store.as_ref()))?;
        let faqs = persisted("load", records::load_all(store.as_ref()))?;

        let mut activity = ActivityLog::with_capacity(config.activity.retained_entries);
        match store.recent_activity(activity.capacity()) {
            Ok(entries) => activity.load(entries),
            Err(e) => warn!(error = %e, "Could not load recent activity"),
        }

        info!(user = %user.id, level = %user.access_level, "Board session opened");
        Ok(Self {
            store,
            user,
            tasks,
            companies,
            collaborators,
            templates,
            faqs,
            activity,
        })
    }

    /// Reload tasks from the store, picking up other sessions' writes.
    pub fn refresh_tasks(&mut self) -> EngineResult<()> {
        self.tasks = persisted("refresh", records::load_all(self.store.as_ref()))?;
        Ok(())
    }

    pub fn user(&self) -> &Collaborator {
        &self.user
    }

    /// Every cached task, unfiltered.
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn collaborators(&self) -> &[Collaborator] {
        &self.collaborators
    }

    pub fn templates(&self) -> &[TaskTemplate] {
        &self.templates
    }

    pub fn faqs(&self) -> &[Faq] {
        &self.faqs
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// What the session user may see.
    pub fn visible(&self) -> VisibleSet {
        visibility::filter(&self.tasks, &self.companies, &self.collaborators, &self.user)
    }

    pub fn metrics(&self, now: DateTime<Utc>) -> BoardMetrics {
        metrics::compute(&self.visible().tasks, now)
    }

    /// A task the session user may see. Invisible tasks are reported as
    /// missing.
    pub fn task(&self, task_id: &str) -> EngineResult<&Task> {
        let by_id = visibility::index_collaborators(&self.collaborators);
        self.tasks
            .iter()
            .find(|t| t.id == task_id)
            .filter(|t| visibility::task_visibility(t, &self.user, &by_id).is_some())
            .ok_or_else(|| EngineError::task_not_found(task_id))
    }

    fn check_faq(&self, faq_id: Option<&str>) -> EngineResult<()> {
        match faq_id.filter(|id| !id.is_empty()) {
            Some(id) if !self.faqs.iter().any(|f| f.id == id) => Err(EngineError::faq_not_found(id)),
            _ => Ok(()),
        }
    }

    fn replace_task(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.insert(0, task),
        }
    }

    fn store_task(&mut self, operation: &str, task: Task) -> EngineResult<Task> {
        let saved = persisted(operation, records::save(self.store.as_ref(), &task))?;
        self.replace_task(saved.clone());
        Ok(saved)
    }

    /// Record an accepted mutation. Activity-log failures are logged and
    /// otherwise ignored.
    fn log(&mut self, event: ActivityEvent, now: DateTime<Utc>) {
        let entry = event.into_entry(&self.user, now);
        if let Err(e) = self.store.log_activity(&entry) {
            warn!(action = %entry.action, error = %e, "Activity log write failed");
        }
        self.activity.record(entry);
    }

    /// Toggle a checklist item.
    pub fn toggle_checklist(
        &mut self,
        task_id: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> EngineResult<Task> {
        let next = checked(
            "toggle_checklist",
            self.task(task_id)
                .and_then(|task| workflow::toggle_item(task, index, &self.user, now)),
        )?;
        let saved = self.store_task("toggle_checklist", next)?;

        let item = &saved.checklist[index];
        self.log(
            ActivityEvent::new("toggle_checklist", "task")
                .entity(&saved.id, &saved.title)
                .details(json!({"item": item.title, "completed": item.completed})),
            now,
        );
        info!(task_id = %saved.id, index, status = saved.status.as_str(), "Checklist toggled");
        Ok(saved)
    }

    /// Set a task's status directly.
    pub fn update_status(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> EngineResult<Task> {
        let (previous, next) = checked("update_status", {
            self.task(task_id).and_then(|task| {
                workflow::set_status(task, status, &self.user, now).map(|n| (task.status, n))
            })
        })?;
        let saved = self.store_task("update_status", next)?;

        self.log(
            ActivityEvent::new("update_status", "task")
                .entity(&saved.id, &saved.title)
                .details(json!({"from": previous.as_str(), "to": status.as_str()})),
            now,
        );
        info!(task_id = %saved.id, status = status.as_str(), "Status updated");
        Ok(saved)
    }

    /// Transfer some or all pending checklist items.
    pub fn transfer(
        &mut self,
        task_id: &str,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<TransferOutcome> {
        let outcome = checked(
            "transfer",
            self.task(task_id).and_then(|task| {
                transfer::transfer(task, request, &self.user, &self.collaborators, now)
            }),
        )?;

        match &outcome {
            TransferOutcome::Full { task } => {
                persisted("transfer", records::save(self.store.as_ref(), task))?;
            }
            TransferOutcome::Partial { original, created } => {
                persisted(
                    "transfer",
                    records::insert_all(self.store.as_ref(), std::slice::from_ref(created)),
                )?;
                if let Err(e) = persisted("transfer", records::save(self.store.as_ref(), original))
                {
                    // The new task is already stored; keep the cache in step with it.
                    self.replace_task(created.clone());
                    return Err(e);
                }
            }
        }

        let (subject, moved) = match &outcome {
            TransferOutcome::Full { task } => {
                self.replace_task(task.clone());
                (task.clone(), None)
            }
            TransferOutcome::Partial { original, created } => {
                self.replace_task(original.clone());
                self.replace_task(created.clone());
                (original.clone(), Some(created.id.clone()))
            }
        };
        self.log(
            ActivityEvent::new(request.mode.kind().as_str(), "task")
                .entity(&subject.id, &subject.title)
                .details(json!({
                    "to": outcome.receptor_id(),
                    "items": request.selected.len(),
                    "newTaskId": moved,
                })),
            now,
        );
        Ok(outcome)
    }

    /// Create tasks. All records are inserted in one batch; on failure
    /// nothing is added locally.
    pub fn create(&mut self, request: &CreationRequest, now: DateTime<Utc>) -> EngineResult<Vec<Task>> {
        let visible = self.visible();
        let records = checked("create", {
            let unknown = request
                .company_ids
                .iter()
                .find(|id| !visible.companies.iter().any(|c| &c.id == *id));
            match unknown {
                Some(id) => Err(EngineError::company_not_found(id)),
                None => request
                    .drafts
                    .iter()
                    .try_for_each(|d| self.check_faq(d.faq_id.as_deref()))
                    .and_then(|()| {
                        let team: Vec<Collaborator> = visible
                            .collaborators
                            .iter()
                            .filter(|c| c.allowed && c.shares_team_with(&self.user))
                            .cloned()
                            .collect();
                        creation::create_tasks(request, &self.user, &team, &self.collaborators, now)
                    }),
            }
        })?;

        persisted("create", records::insert_all(self.store.as_ref(), &records))?;
        for task in records.iter().rev() {
            self.tasks.insert(0, task.clone());
        }

        self.log(
            ActivityEvent::new("create", "task").details(json!({
                "count": records.len(),
                "replicated": request.replicate_to_all_members,
                "titles": request.drafts.iter().map(|d| d.title.clone()).collect::<Vec<_>>(),
            })),
            now,
        );
        info!(count = records.len(), "Tasks created");
        Ok(records)
    }

    /// Edit an existing task's fields.
    pub fn edit(
        &mut self,
        task_id: &str,
        draft: &TaskDraft,
        company_id: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<Task> {
        let visible = self.visible();
        let next = checked(
            "edit",
            self.task(task_id).and_then(|task| {
                if let Some(id) = &company_id
                    && !visible.companies.iter().any(|c| &c.id == id)
                {
                    return Err(EngineError::company_not_found(id));
                }
                // A link left dangling by a deleted entry may be kept as is.
                if draft.faq_id != task.faq_id {
                    self.check_faq(draft.faq_id.as_deref())?;
                }
                creation::edit_task(task, draft, company_id.clone(), &self.user, &self.collaborators, now)
            }),
        )?;
        let saved = self.store_task("edit", next)?;
        self.log(
            ActivityEvent::new("edit", "task").entity(&saved.id, &saved.title),
            now,
        );
        Ok(saved)
    }

    /// Replace or extend a task's notes.
    ///
    /// The creator and managers may rewrite notes freely; anyone else may
    /// only append to what is already there.
    pub fn update_notes(&mut self, task_id: &str, notes: &str, now: DateTime<Utc>) -> EngineResult<Task> {
        let next = checked(
            "update_notes",
            self.task(task_id).and_then(|task| {
                let may_rewrite = self.user.is_manager()
                    || task.creator_id.as_deref() == Some(self.user.id.as_str());
                let current = task.notes.as_deref().unwrap_or("");
                if !may_rewrite && !notes.starts_with(current) {
                    return Err(EngineError::permission_denied(
                        "Only the task creator or a manager can change existing notes; you can add to them",
                    )
                    .with_field("notes"));
                }
                let mut next = task.clone();
                next.notes = Some(notes.to_string()).filter(|n| !n.is_empty());
                Ok(next)
            }),
        )?;
        let saved = self.store_task("update_notes", next)?;
        self.log(
            ActivityEvent::new("update_notes", "task").entity(&saved.id, &saved.title),
            now,
        );
        Ok(saved)
    }

    /// Upload a file and link it to the task.
    pub fn attach_file(
        &mut self,
        task_id: &str,
        file_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> EngineResult<Task> {
        let task = checked("attach_file", self.task(task_id).cloned())?;
        let path = format!("{}/{}-{}", task.id, Uuid::now_v7(), file_name);
        let url = persisted(
            "attach_file",
            self.store.upload_file(ATTACHMENT_BUCKET, &path, bytes),
        )?;

        let mut next = task;
        next.attachment_url = Some(url);
        let saved = match self.store_task("attach_file", next) {
            Ok(saved) => saved,
            Err(e) => {
                if let Err(cleanup) = self.store.remove_file(ATTACHMENT_BUCKET, &[path]) {
                    warn!(error = %cleanup, "Could not remove orphaned upload");
                }
                return Err(e);
            }
        };
        self.log(
            ActivityEvent::new("attach_file", "task")
                .entity(&saved.id, &saved.title)
                .details(json!({"file": file_name})),
            now,
        );
        Ok(saved)
    }

    /// Permanently delete a task. Admin only.
    pub fn delete_task(&mut self, task_id: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let task = checked("delete_task", {
            if !self.user.is_admin() {
                Err(EngineError::permission_denied("Only admins can delete tasks"))
            } else {
                self.task(task_id).cloned()
            }
        })?;
        persisted("delete_task", self.store.delete(records::Entity::Tasks, task_id))?;
        self.tasks.retain(|t| t.id != task_id);
        self.log(
            ActivityEvent::new("delete", "task").entity(&task.id, &task.title),
            now,
        );
        Ok(())
    }

    /// Create or update a company. Gestor or admin.
    pub fn save_company(&mut self, company: Company, now: DateTime<Utc>) -> EngineResult<Company> {
        let company = checked("save_company", {
            if !self.user.is_manager() {
                Err(EngineError::permission_denied("Only managers can edit companies"))
            } else if company.name.trim().is_empty() {
                Err(EngineError::missing_field("name"))
            } else {
                Ok(Company {
                    id: if company.id.is_empty() {
                        Uuid::now_v7().to_string()
                    } else {
                        company.id
                    },
                    name: company.name.trim().to_string(),
                    logo: company.logo,
                    team: dedup_teams(&company.team),
                })
            }
        })?;

        let exists = self.companies.iter().any(|c| c.id == company.id);
        if exists {
            persisted("save_company", records::save(self.store.as_ref(), &company))?;
        } else {
            persisted(
                "save_company",
                records::insert_all(self.store.as_ref(), std::slice::from_ref(&company)),
            )?;
        }

        match self.companies.iter_mut().find(|c| c.id == company.id) {
            Some(slot) => *slot = company.clone(),
            None => self.companies.push(company.clone()),
        }
        self.log(
            ActivityEvent::new(if exists { "update" } else { "create" }, "company")
                .entity(&company.id, &company.name),
            now,
        );
        Ok(company)
    }

    /// Delete a company. Gestor or admin. Tasks that reference it keep
    /// their company id.
    pub fn delete_company(&mut self, company_id: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let company = checked("delete_company", {
            if !self.user.is_manager() {
                Err(EngineError::permission_denied("Only managers can delete companies"))
            } else {
                self.companies
                    .iter()
                    .find(|c| c.id == company_id)
                    .cloned()
                    .ok_or_else(|| EngineError::company_not_found(company_id))
            }
        })?;
        persisted(
            "delete_company",
            self.store.delete(records::Entity::Companies, company_id),
        )?;
        self.companies.retain(|c| c.id != company_id);
        self.log(
            ActivityEvent::new("delete", "company").entity(&company.id, &company.name),
            now,
        );
        Ok(())
    }

    /// Change a collaborator's team, access level or access. Admin only.
    pub fn update_collaborator(
        &mut self,
        collaborator_id: &str,
        update: &CollaboratorUpdate,
        now: DateTime<Utc>,
    ) -> EngineResult<Collaborator> {
        let next = checked("update_collaborator", {
            if !self.user.is_admin() {
                Err(EngineError::permission_denied("Only admins can edit collaborators"))
            } else {
                self.collaborators
                    .iter()
                    .find(|c| c.id == collaborator_id)
                    .cloned()
                    .ok_or_else(|| EngineError::collaborator_not_found(collaborator_id))
                    .map(|mut next| {
                        if let Some(role) = &update.role {
                            next.role = role.trim().to_string();
                        }
                        if let Some(level) = update.access_level {
                            next.access_level = level;
                        }
                        if let Some(allowed) = update.allowed {
                            next.allowed = allowed;
                        }
                        next
                    })
            }
        })?;

        let saved = persisted(
            "update_collaborator",
            records::save(self.store.as_ref(), &next),
        )?;
        if let Some(slot) = self.collaborators.iter_mut().find(|c| c.id == saved.id) {
            *slot = saved.clone();
        }
        if saved.id == self.user.id {
            self.user = saved.clone();
        }
        self.log(
            ActivityEvent::new("update", "collaborator")
                .entity(&saved.id, &saved.name)
                .details(json!({
                    "role": saved.role,
                    "accessLevel": saved.access_level,
                    "allowed": saved.allowed,
                })),
            now,
        );
        Ok(saved)
    }

    /// Remove a collaborator's profile. Admin only. Their tasks stay as
    /// they are, still pointing at the removed id.
    pub fn delete_collaborator(&mut self, collaborator_id: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let removed = checked("delete_collaborator", {
            if !self.user.is_admin() {
                Err(EngineError::permission_denied("Only admins can remove collaborators"))
            } else if collaborator_id == self.user.id {
                Err(EngineError::precondition("You cannot remove your own profile"))
            } else {
                self.collaborators
                    .iter()
                    .find(|c| c.id == collaborator_id)
                    .cloned()
                    .ok_or_else(|| EngineError::collaborator_not_found(collaborator_id))
            }
        })?;
        persisted(
            "delete_collaborator",
            self.store.delete(records::Entity::Profiles, collaborator_id),
        )?;
        self.collaborators.retain(|c| c.id != collaborator_id);
        self.log(
            ActivityEvent::new("delete", "collaborator").entity(&removed.id, &removed.name),
            now,
        );
        info!(collaborator = %removed.id, "Collaborator removed");
        Ok(())
    }

    /// Store a new task template. Gestor or admin.
    pub fn save_template(&mut self, template: TaskTemplate, now: DateTime<Utc>) -> EngineResult<TaskTemplate> {
        checked(
            "save_template",
            if self.user.is_manager() {
                Ok(())
            } else {
                Err(EngineError::permission_denied("Only managers can import templates"))
            },
        )?;
        persisted(
            "save_template",
            records::insert_all(self.store.as_ref(), std::slice::from_ref(&template)),
        )?;
        self.templates.push(template.clone());
        self.log(
            ActivityEvent::new("import", "template")
                .entity(&template.id, &template.name)
                .details(json!({"tasks": template.tasks.len()})),
            now,
        );
        Ok(template)
    }

    /// Create or update a FAQ entry. Gestor or admin.
    pub fn save_faq(&mut self, faq: Faq, now: DateTime<Utc>) -> EngineResult<Faq> {
        let existing = self.faqs.iter().find(|f| !faq.id.is_empty() && f.id == faq.id).cloned();
        let faq = checked("save_faq", {
            if !self.user.is_manager() {
                Err(EngineError::permission_denied("Only managers can edit the FAQ"))
            } else if faq.question.trim().is_empty() {
                Err(EngineError::missing_field("question"))
            } else {
                Ok(Faq {
                    id: if faq.id.is_empty() {
                        Uuid::now_v7().to_string()
                    } else {
                        faq.id
                    },
                    question: faq.question.trim().to_string(),
                    creator_id: existing
                        .as_ref()
                        .and_then(|f| f.creator_id.clone())
                        .or_else(|| Some(self.user.id.clone())),
                    ..faq
                })
            }
        })?;

        if existing.is_some() {
            persisted("save_faq", records::save(self.store.as_ref(), &faq))?;
        } else {
            persisted(
                "save_faq",
                records::insert_all(self.store.as_ref(), std::slice::from_ref(&faq)),
            )?;
        }

        match self.faqs.iter_mut().find(|f| f.id == faq.id) {
            Some(slot) => *slot = faq.clone(),
            None => self.faqs.push(faq.clone()),
        }
        self.log(
            ActivityEvent::new(if existing.is_some() { "update" } else { "create" }, "faq")
                .entity(&faq.id, &faq.question),
            now,
        );
        Ok(faq)
    }

    /// Delete a FAQ entry. Gestor or admin. Linked tasks keep their
    /// `faq_id`.
    pub fn delete_faq(&mut self, faq_id: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let faq = checked("delete_faq", {
            if !self.user.is_manager() {
                Err(EngineError::permission_denied("Only managers can edit the FAQ"))
            } else {
                self.faqs
                    .iter()
                    .find(|f| f.id == faq_id)
                    .cloned()
                    .ok_or_else(|| EngineError::faq_not_found(faq_id))
            }
        })?;
        persisted("delete_faq", self.store.delete(records::Entity::Faqs, faq_id))?;
        self.faqs.retain(|f| f.id != faq_id);
        self.log(
            ActivityEvent::new("delete", "faq").entity(&faq.id, &faq.question),
            now,
        );
        Ok(())
    }

    /// Stamp visible tasks whose overdue notices were delivered. Stops at
    /// the first failed write; tasks stamped before it stay stamped.
    pub fn mark_notified(&mut self, task_ids: &[String], now: DateTime<Utc>) -> EngineResult<Vec<Task>> {
        let mut stamped = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            let next = checked("mark_notified", self.task(task_id).map(|t| overdue::mark_notified(t, now)))?;
            stamped.push(self.store_task("mark_notified", next)?);
        }
        if !stamped.is_empty() {
            info!(count = stamped.len(), "Overdue notices recorded");
        }
        Ok(stamped)
    }
}
