//! Shared fixtures for integration tests.

#![allow(dead_code)]

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use squad_tasks::access::AccessLevel;
use squad_tasks::db::{Database, Entity, Store};
use squad_tasks::types::{
    ActivityEntry, ChecklistItem, Collaborator, Company, Task, TaskPriority, TaskStatus,
    TransferHistory,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed "now" used across tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn later(days: i64) -> DateTime<Utc> {
    t0() + Duration::days(days)
}

pub fn person(id: &str, role: &str, level: AccessLevel) -> Collaborator {
    Collaborator {
        id: id.into(),
        name: id.to_uppercase(),
        email: Some(format!("{}@example.com", id)),
        avatar: String::new(),
        role: role.into(),
        access_level: level,
        allowed: true,
        area: None,
        must_change_password: false,
    }
}

pub fn company(id: &str, name: &str, teams: &[&str]) -> Company {
    Company {
        id: id.into(),
        name: name.into(),
        logo: String::new(),
        team: teams.iter().map(|t| t.to_string()).collect(),
    }
}

/// A pending task with the given open checklist titles.
pub fn task(id: &str, assignee: &str, creator: &str, items: &[&str]) -> Task {
    Task {
        id: id.into(),
        title: format!("Task {}", id),
        description: String::new(),
        status: TaskStatus::Pending,
        priority: TaskPriority::Medium,
        assignee_id: assignee.into(),
        company_id: None,
        due_date: later(7),
        created_at: t0() - Duration::days(1),
        started_at: None,
        completed_at: None,
        creator_id: Some(creator.into()),
        faq_id: None,
        reminder: None,
        checklist: items.iter().map(|t| ChecklistItem::open(*t)).collect(),
        repeat_frequency: Default::default(),
        attachment_url: None,
        notes: None,
        is_replicated: false,
        transfer_history: TransferHistory::new(),
        due_notification_sent: false,
        last_notification_date: None,
    }
}

pub fn titles(task: &Task) -> Vec<&str> {
    task.checklist.iter().map(|i| i.title.as_str()).collect()
}

pub fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Store double that delegates to an in-memory database and can be told
/// to fail every write.
pub struct FailingStore {
    pub inner: Database,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("connection reset by peer");
        }
        Ok(())
    }
}

impl Store for FailingStore {
    fn get_all(&self, entity: Entity) -> Result<Vec<Value>> {
        self.inner.get_all(entity)
    }

    fn get_by_id(&self, entity: Entity, id: &str) -> Result<Option<Value>> {
        self.inner.get_by_id(entity, id)
    }

    fn insert(&self, entity: Entity, rows: &[Value]) -> Result<()> {
        self.check()?;
        self.inner.insert(entity, rows)
    }

    fn update(&self, entity: Entity, id: &str, fields: &Value) -> Result<Value> {
        self.check()?;
        self.inner.update(entity, id, fields)
    }

    fn delete(&self, entity: Entity, id: &str) -> Result<bool> {
        self.check()?;
        self.inner.delete(entity, id)
    }

    fn upload_file(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String> {
        self.check()?;
        self.inner.upload_file(bucket, path, bytes)
    }

    fn remove_file(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.inner.remove_file(bucket, paths)
    }

    fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.inner.log_activity(entry)
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        self.inner.recent_activity(limit)
    }
}
