//! Mapping between in-memory records and store rows.
//!
//! In memory every record serializes with camelCase keys; the store uses
//! snake_case column names. Only top-level keys are renamed: nested
//! documents (checklist items, history entries, template tasks) are
//! stored as they serialize.

use super::{StoreError, Store};
use crate::types::{ActivityEntry, Collaborator, Company, Faq, Task, TaskTemplate};
use anyhow::Result;
use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// Store tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Tasks,
    Companies,
    Profiles,
    TaskTemplates,
    Faqs,
    ActivityLogs,
}

impl Entity {
    pub const ALL: [Entity; 6] = [
        Entity::Tasks,
        Entity::Companies,
        Entity::Profiles,
        Entity::TaskTemplates,
        Entity::Faqs,
        Entity::ActivityLogs,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Entity::Tasks => "tasks",
            Entity::Companies => "companies",
            Entity::Profiles => "profiles",
            Entity::TaskTemplates => "task_templates",
            Entity::Faqs => "faqs",
            Entity::ActivityLogs => "activity_logs",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A record type stored in one entity table.
pub trait Record: Serialize + DeserializeOwned {
    const ENTITY: Entity;

    fn record_id(&self) -> &str;
}

impl Record for Task {
    const ENTITY: Entity = Entity::Tasks;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Company {
    const ENTITY: Entity = Entity::Companies;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Collaborator {
    const ENTITY: Entity = Entity::Profiles;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for TaskTemplate {
    const ENTITY: Entity = Entity::TaskTemplates;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Faq {
    const ENTITY: Entity = Entity::Faqs;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for ActivityEntry {
    const ENTITY: Entity = Entity::ActivityLogs;

    fn record_id(&self) -> &str {
        &self.id
    }
}

fn rename_keys(value: Value, rename: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, v)| (rename(&key), v))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// camelCase top-level keys to snake_case.
pub fn keys_to_snake(value: Value) -> Value {
    rename_keys(value, |k| k.to_snake_case())
}

/// snake_case top-level keys to camelCase.
pub fn keys_to_camel(value: Value) -> Value {
    rename_keys(value, |k| k.to_lower_camel_case())
}

/// Serialize a record as a store row.
pub fn to_row<R: Record>(record: &R) -> Result<Value> {
    let value = serde_json::to_value(record).map_err(|source| StoreError::MalformedRecord {
        entity: R::ENTITY,
        source,
    })?;
    Ok(keys_to_snake(value))
}

/// Deserialize a store row.
pub fn from_row<R: Record>(row: Value) -> Result<R> {
    serde_json::from_value(keys_to_camel(row)).map_err(|source| {
        StoreError::MalformedRecord {
            entity: R::ENTITY,
            source,
        }
        .into()
    })
}

/// Load every record of one type.
pub fn load_all<R: Record>(store: &dyn Store) -> Result<Vec<R>> {
    store
        .get_all(R::ENTITY)?
        .into_iter()
        .map(from_row)
        .collect()
}

/// Load one record by id.
pub fn load_one<R: Record>(store: &dyn Store, id: &str) -> Result<Option<R>> {
    store.get_by_id(R::ENTITY, id)?.map(from_row).transpose()
}

/// Insert a batch of records, all or nothing.
pub fn insert_all<R: Record>(store: &dyn Store, records: &[R]) -> Result<()> {
    let rows = records.iter().map(to_row).collect::<Result<Vec<_>>>()?;
    store.insert(R::ENTITY, &rows)
}

/// Overwrite a stored record with the given one.
///
/// Keys the stored row has but the record no longer serializes (cleared
/// optional fields) are sent as null so the merge drops their old values.
pub fn save<R: Record>(store: &dyn Store, record: &R) -> Result<R> {
    let mut row = to_row(record)?;
    if let Some(Value::Object(current)) = store.get_by_id(R::ENTITY, record.record_id())?
        && let Value::Object(patch) = &mut row
    {
        for key in current.keys() {
            if !patch.contains_key(key) {
                patch.insert(key.clone(), Value::Null);
            }
        }
    }
    from_row(store.update(R::ENTITY, record.record_id(), &row)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;
    use crate::types::{
        ChecklistItem, RepeatFrequency, TaskPriority, TaskStatus, TransferEntry,
        TransferHistory, TransferKind,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn person() -> Collaborator {
        Collaborator {
            id: "u1".into(),
            name: "Ana".into(),
            email: Some("ana@example.com".into()),
            avatar: "a.png".into(),
            role: "QA".into(),
            access_level: AccessLevel::Gestor,
            allowed: true,
            area: Some("Ops".into()),
            must_change_password: true,
        }
    }

    fn full_task() -> Task {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let who = person();
        Task {
            id: "t1".into(),
            title: "Deploy".into(),
            description: "Ship it".into(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            assignee_id: "u1".into(),
            company_id: Some("c1".into()),
            due_date: t0,
            created_at: t0,
            started_at: Some(t0),
            completed_at: None,
            creator_id: Some("u1".into()),
            faq_id: Some("f1".into()),
            reminder: Some(t0),
            checklist: vec![ChecklistItem::closed("A", &who), ChecklistItem::open("B")],
            repeat_frequency: RepeatFrequency::Weekly,
            attachment_url: Some("file://x".into()),
            notes: Some("n".into()),
            is_replicated: true,
            transfer_history: TransferHistory::new().appended(
                TransferEntry::new(TransferKind::Creation, &who, &who, t0)
                    .with_deadline(t0)
                    .with_project_name("P"),
            ),
            due_notification_sent: true,
            last_notification_date: Some(t0),
        }
    }

    #[test]
    fn test_task_row_uses_snake_case_columns() {
        let row = to_row(&full_task()).unwrap();
        assert_eq!(row["assignee_id"], json!("u1"));
        assert_eq!(row["is_replicated"], json!(true));
        assert_eq!(row["due_notification_sent"], json!(true));
        assert_eq!(row["status"], json!("Em Andamento"));
        assert!(row.get("assigneeId").is_none());
        // Nested documents keep their own naming.
        assert_eq!(row["transfer_history"][0]["fromId"], json!("u1"));
        assert_eq!(row["checklist"][0]["completedBy"], json!("u1"));
    }

    #[test]
    fn test_records_survive_the_boundary() {
        let task = full_task();
        assert_eq!(from_row::<Task>(to_row(&task).unwrap()).unwrap(), task);

        let who = person();
        assert_eq!(from_row::<Collaborator>(to_row(&who).unwrap()).unwrap(), who);
    }

    #[test]
    fn test_malformed_row_is_typed() {
        let err = from_row::<Company>(json!({"id": 3})).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::MalformedRecord { entity: Entity::Companies, .. })
        ));
    }
}
