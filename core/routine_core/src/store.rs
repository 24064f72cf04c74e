use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use std::{collections::HashMap, path::Path};
use thiserror::Error;
use tracing::{error, warn};

pub const HISTORY_KEY: &str = "routine_history_v2";
pub const REFLECTIONS_KEY: &str = "routine_reflections_v2";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable string blobs by key.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError>;
}

/// Result of a write-through after a mutation. The in-memory state is kept
/// either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Durable,
    Failed { error: String },
}

impl WriteStatus {
    pub fn is_durable(&self) -> bool {
        matches!(self, WriteStatus::Durable)
    }
}

/// Saves `blob`, retrying once before giving up.
pub fn write_through(store: &mut impl KeyValueStore, key: &str, blob: &str) -> WriteStatus {
    match store.save(key, blob) {
        Ok(()) => return WriteStatus::Durable,
        Err(err) => warn!("save {key} failed, retrying once: {err}"),
    }
    match store.save(key, blob) {
        Ok(()) => WriteStatus::Durable,
        Err(err) => {
            error!("save {key} failed after retry: {err}");
            WriteStatus::Failed {
                error: err.to_string(),
            }
        }
    }
}

/// Loads and parses `key`. Missing, unreadable and unparseable blobs all
/// come back as `T::default()`.
pub fn load_or_default<T: Default>(
    store: &impl KeyValueStore,
    key: &str,
    parse: impl FnOnce(&str) -> serde_json::Result<T>,
) -> T {
    let blob = match store.load(key) {
        Ok(Some(v)) => v,
        Ok(None) => return T::default(),
        Err(err) => {
            warn!("load {key} failed, starting empty: {err}");
            return T::default();
        }
    };
    match parse(&blob) {
        Ok(v) => v,
        Err(err) => {
            warn!("parse {key} failed, starting empty: {err}");
            T::default()
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }
        Ok(None)
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            r#"
INSERT INTO kv (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value=excluded.value,
  updated_at=excluded.updated_at
"#,
            (key, blob, &updated_at),
        )?;
        Ok(())
    }
}

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
"#,
    )
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(mut self, key: &str, blob: &str) -> Self {
        self.blobs.insert(key.to_string(), blob.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
