//! Persistence layer.
//!
//! [`Store`] is everything the board needs from a backing store: entity
//! CRUD over snake_case JSON rows, file storage and the activity log.
//! [`Database`] implements it over SQLite, one JSON document per row.

pub mod files;
pub mod records;

pub use files::FileStore;
pub use records::{Entity, Record};

use crate::types::ActivityEntry;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Typed store failures. Everything else surfaces as plain `anyhow` errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {entity} row with id {id}")]
    UnknownRow { entity: Entity, id: String },

    #[error("{entity} record is missing a string id")]
    MissingId { entity: Entity },

    #[error("malformed {entity} record: {source}")]
    MalformedRecord {
        entity: Entity,
        #[source]
        source: serde_json::Error,
    },

    #[error("path escapes the media directory: {0}")]
    PathEscape(String),

    #[error("file storage is not configured")]
    NoFileStorage,
}

/// Backing store for board records.
///
/// Rows are snake_case JSON objects keyed by `id`. Writes are
/// last-write-wins; there is no versioning.
pub trait Store: Send + Sync {
    fn get_all(&self, entity: Entity) -> Result<Vec<Value>>;

    fn get_by_id(&self, entity: Entity, id: &str) -> Result<Option<Value>>;

    /// Insert every row or none of them.
    fn insert(&self, entity: Entity, rows: &[Value]) -> Result<()>;

    /// Overwrite the given top-level fields of one row. Returns the new row.
    fn update(&self, entity: Entity, id: &str, fields: &Value) -> Result<Value>;

    /// Returns false if there was no such row.
    fn delete(&self, entity: Entity, id: &str) -> Result<bool>;

    /// Store a file and return its public URL.
    fn upload_file(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String>;

    fn remove_file(&self, bucket: &str, paths: &[String]) -> Result<()>;

    fn log_activity(&self, entry: &ActivityEntry) -> Result<()>;

    /// Most recent activity entries, newest first.
    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    files: Option<FileStore>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            files: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            files: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Attach on-disk file storage.
    pub fn with_files(mut self, files: FileStore) -> Self {
        self.files = Some(files);
        self
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }

    fn files(&self) -> Result<&FileStore> {
        self.files
            .as_ref()
            .ok_or_else(|| StoreError::NoFileStorage.into())
    }
}

fn parse_row(entity: Entity, data: &str) -> Result<Value> {
    serde_json::from_str(data)
        .map_err(|source| StoreError::MalformedRecord { entity, source }.into())
}

fn row_id(entity: Entity, row: &Value) -> Result<String> {
    row.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::MissingId { entity }.into())
}

fn get_row(conn: &Connection, entity: Entity, id: &str) -> Result<Option<Value>> {
    let sql = format!("SELECT data FROM {} WHERE id = ?1", entity.table());
    let data: Option<String> = conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()?;
    data.map(|d| parse_row(entity, &d)).transpose()
}

impl Store for Database {
    fn get_all(&self, entity: Entity) -> Result<Vec<Value>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT data FROM {} ORDER BY created_at, rowid",
                entity.table()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.iter().map(|data| parse_row(entity, data)).collect()
        })
    }

    fn get_by_id(&self, entity: Entity, id: &str) -> Result<Option<Value>> {
        self.with_conn(|conn| get_row(conn, entity, id))
    }

    fn insert(&self, entity: Entity, rows: &[Value]) -> Result<()> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let sql = format!(
                "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                entity.table()
            );
            for row in rows {
                let id = row_id(entity, row)?;
                tx.execute(&sql, params![id, serde_json::to_string(row)?, now])?;
            }
            tx.commit()?;
            debug!(entity = %entity, count = rows.len(), "Inserted rows");
            Ok(())
        })
    }

    fn update(&self, entity: Entity, id: &str, fields: &Value) -> Result<Value> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut row = get_row(&tx, entity, id)?.ok_or_else(|| StoreError::UnknownRow {
                entity,
                id: id.to_string(),
            })?;

            if let (Value::Object(target), Value::Object(patch)) = (&mut row, fields) {
                for (key, value) in patch {
                    if key != "id" {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }

            let sql = format!(
                "UPDATE {} SET data = ?1, updated_at = ?2 WHERE id = ?3",
                entity.table()
            );
            tx.execute(&sql, params![serde_json::to_string(&row)?, now, id])?;
            tx.commit()?;
            Ok(row)
        })
    }

    fn delete(&self, entity: Entity, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", entity.table());
            Ok(conn.execute(&sql, params![id])? > 0)
        })
    }

    fn upload_file(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String> {
        self.files()?.upload(bucket, path, bytes)
    }

    fn remove_file(&self, bucket: &str, paths: &[String]) -> Result<()> {
        self.files()?.remove(bucket, paths)
    }

    fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let row = records::to_row(entry)?;
        let created_at = entry.created_at.timestamp_millis();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO activity_logs (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![entry.id, serde_json::to_string(&row)?, created_at],
            )?;
            Ok(())
        })
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data FROM activity_logs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit as i64], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        rows.iter()
            .map(|data| records::from_row(parse_row(Entity::ActivityLogs, data)?))
            .collect()
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
