//! Integration tests for the database layer.
//!
//! These tests exercise the SQLite store through the `Store` trait and the
//! typed record helpers, using an in-memory database.

mod common;

use common::{company, person, setup_db, t0, task};
use serde_json::json;
use squad_tasks::access::AccessLevel;
use squad_tasks::db::{Database, Entity, Store, records};
use squad_tasks::types::{ActivityEntry, Collaborator, Task};

mod row_tests {
    use super::*;

    #[test]
    fn rows_use_snake_case_columns() {
        let db = setup_db();
        let mut t = task("t1", "a", "b", &["A"]);
        t.is_replicated = true;
        records::insert_all(&db, &[t]).unwrap();

        let row = db.get_by_id(Entity::Tasks, "t1").unwrap().unwrap();
        assert_eq!(row["assignee_id"], json!("a"));
        assert_eq!(row["is_replicated"], json!(true));
        assert!(row.get("assigneeId").is_none());
        assert!(row["checklist"][0].get("completedBy").is_none());
        assert_eq!(row["checklist"][0]["title"], json!("A"));
    }

    #[test]
    fn typed_records_round_trip() {
        let db = setup_db();
        let people = vec![
            person("a", "QA", AccessLevel::Admin),
            person("b", "Dev", AccessLevel::Colaborador),
        ];
        records::insert_all(&db, &people).unwrap();
        let back: Vec<Collaborator> = records::load_all(&db).unwrap();
        assert_eq!(back, people);
    }

    #[test]
    fn missing_rows_are_none() {
        let db = setup_db();
        let missing: Option<Task> = records::load_one(&db, "nope").unwrap();
        assert!(missing.is_none());
        assert!(!db.delete(Entity::Tasks, "nope").unwrap());
    }
}

mod write_tests {
    use super::*;

    #[test]
    fn batch_insert_is_all_or_nothing() {
        let db = setup_db();
        records::insert_all(&db, &[company("c1", "Acme", &["QA"])]).unwrap();

        let batch = vec![company("c2", "Globex", &[]), company("c1", "Dup", &[])];
        assert!(records::insert_all(&db, &batch).is_err());

        let all = db.get_all(Entity::Companies).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["name"], json!("Acme"));
    }

    #[test]
    fn update_merges_top_level_fields() {
        let db = setup_db();
        records::insert_all(&db, &[company("c1", "Acme", &["QA"])]).unwrap();

        let row = db
            .update(Entity::Companies, "c1", &json!({"name": "Acme Corp", "id": "other"}))
            .unwrap();
        assert_eq!(row["name"], json!("Acme Corp"));
        assert_eq!(row["id"], json!("c1"));
        assert_eq!(row["team"], json!(["QA"]));
    }

    #[test]
    fn update_of_unknown_row_fails() {
        let db = setup_db();
        assert!(db.update(Entity::Tasks, "ghost", &json!({"title": "x"})).is_err());
    }

    #[test]
    fn save_clears_fields_the_record_dropped() {
        let db = setup_db();
        let mut t = task("t1", "a", "a", &[]);
        t.started_at = Some(t0());
        t.notes = Some("draft".into());
        records::insert_all(&db, std::slice::from_ref(&t)).unwrap();

        t.started_at = None;
        t.notes = None;
        let saved = records::save(&db, &t).unwrap();
        assert_eq!(saved, t);
        let reloaded: Task = records::load_one(&db, "t1").unwrap().unwrap();
        assert_eq!(reloaded.started_at, None);
        assert_eq!(reloaded.notes, None);
    }
}

mod activity_tests {
    use super::*;
    use chrono::Duration;

    fn entry(id: &str, minutes: i64) -> ActivityEntry {
        ActivityEntry {
            id: id.into(),
            created_at: t0() + Duration::minutes(minutes),
            user_id: "u".into(),
            user_name: "U".into(),
            action: "create".into(),
            entity_type: "task".into(),
            entity_id: None,
            entity_name: None,
            details: Some(json!({"count": 1})),
        }
    }

    #[test]
    fn recent_activity_is_newest_first_and_limited() {
        let db = setup_db();
        for (i, id) in ["e1", "e2", "e3"].iter().enumerate() {
            db.log_activity(&entry(id, i as i64)).unwrap();
        }
        let recent = db.recent_activity(2).unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e2"]);
        assert_eq!(recent[0].details, Some(json!({"count": 1})));
    }
}

mod file_tests {
    use super::*;
    use squad_tasks::db::FileStore;

    #[test]
    fn uploads_need_file_storage() {
        let db = setup_db();
        assert!(db.upload_file("task-attachments", "a.txt", b"x").is_err());
    }

    #[test]
    fn uploads_land_under_the_media_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db: Database = setup_db().with_files(FileStore::new(dir.path(), "file:///media/"));

        let url = db.upload_file("task-attachments", "t1/a.txt", b"hello").unwrap();
        assert_eq!(url, "file:///media/task-attachments/t1/a.txt");
        let on_disk = dir.path().join("task-attachments/t1/a.txt");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"hello");

        db.remove_file("task-attachments", &["t1/a.txt".to_string()]).unwrap();
        assert!(!on_disk.exists());
        assert!(db.upload_file("task-attachments", "../escape.txt", b"x").is_err());
    }
}

mod file_backed_tests {
    use super::*;

    #[test]
    fn reopening_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/board.db");
        {
            let db = Database::open(&path).unwrap();
            records::insert_all(&db, &[task("t1", "a", "a", &["A"])]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        let tasks: Vec<Task> = records::load_all(&db).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].checklist.len(), 1);
    }
}
