//! Activity-log sink.
//!
//! Every accepted mutation produces one entry. The store keeps them all;
//! the session keeps only the most recent `capacity` entries.

use crate::types::{ActivityEntry, Collaborator};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

pub const DEFAULT_RETAINED_ENTRIES: usize = 100;

/// What happened, before it is stamped with an id and time.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Option<Value>,
}

impl ActivityEvent {
    pub fn new(action: &'static str, entity_type: &'static str) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            entity_name: None,
            details: None,
        }
    }

    pub fn entity(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self.entity_name = Some(name.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_entry(self, actor: &Collaborator, now: DateTime<Utc>) -> ActivityEntry {
        ActivityEntry {
            id: Uuid::now_v7().to_string(),
            created_at: now,
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            action: self.action.to_string(),
            entity_type: self.entity_type.to_string(),
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            details: self.details,
        }
    }
}

/// Bounded, newest-first activity buffer.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    capacity: usize,
    entries: VecDeque<ActivityEntry>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETAINED_ENTRIES)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an entry, evicting the oldest when full.
    pub fn record(&mut self, entry: ActivityEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Replace the buffer with entries loaded from the store (newest first).
    pub fn load(&mut self, entries: impl IntoIterator<Item = ActivityEntry>) {
        self.entries = entries.into_iter().take(self.capacity).collect();
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessLevel;

    fn actor() -> Collaborator {
        Collaborator {
            id: "u1".into(),
            name: "Ana".into(),
            email: None,
            avatar: String::new(),
            role: "QA".into(),
            access_level: AccessLevel::Gestor,
            allowed: true,
            area: None,
            must_change_password: false,
        }
    }

    #[test]
    fn test_event_stamps_actor() {
        let entry = ActivityEvent::new("update_status", "task")
            .entity("t1", "Deploy")
            .into_entry(&actor(), Utc::now());
        assert_eq!(entry.user_name, "Ana");
        assert_eq!(entry.entity_id.as_deref(), Some("t1"));
        assert_eq!(entry.action, "update_status");
    }

    #[test]
    fn test_retains_most_recent() {
        let mut log = ActivityLog::with_capacity(3);
        for i in 0..5 {
            let entry = ActivityEvent::new("create", "task")
                .entity(format!("t{}", i), "x")
                .into_entry(&actor(), Utc::now());
            log.record(entry);
        }
        let ids: Vec<_> = log
            .recent()
            .filter_map(|e| e.entity_id.clone())
            .collect();
        assert_eq!(ids, vec!["t4", "t3", "t2"]);
    }
}
