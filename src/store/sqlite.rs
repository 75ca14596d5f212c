//! SQLite-backed structured store
//!
//! A single `kv_store` table holds one JSON document per logical key. The
//! connection sits behind an async mutex, so every operation is serialized
//! and the question set is always written together with its sync time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::{
    LocalStore, StorageError, ANSWERED_QUESTIONS_KEY, DEFAULT_HISTORY_LIMIT, LAST_SYNC_KEY,
    QUESTION_CACHE_KEY,
};
use crate::config::StoreConfig;
use crate::questions::types::validate_all;
use crate::questions::{AnsweredQuestionEntry, CacheMetadata, QuestionRecord};

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Initialize the key-value schema
///
/// File-backed databases are switched to WAL mode so a second process (another
/// tab of the game, the CLI) can read while one writes.
pub fn initialize_schema(conn: &Connection, wal: bool) -> Result<(), StorageError> {
    if wal {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("SQLite journal mode: {}", mode);
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

fn put_value(conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, value, Utc::now().to_rfc3339()],
    )
    .map_err(|e| StorageError::Write(e.to_string()))?;
    Ok(())
}

pub struct SqliteStore {
    location: StoreLocation,
    history_limit: usize,
    conn: OnceCell<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(location: StoreLocation, history_limit: usize) -> Self {
        Self {
            location,
            history_limit,
            conn: OnceCell::new(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreLocation::File(path.into()), DEFAULT_HISTORY_LIMIT)
    }

    pub fn in_memory() -> Self {
        Self::new(StoreLocation::Memory, DEFAULT_HISTORY_LIMIT)
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StorageError> {
        let path = config
            .resolved_path()
            .ok_or_else(|| StorageError::Database("could not determine store path".to_string()))?;
        Ok(Self::new(StoreLocation::File(path), config.history_limit))
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn open_connection(location: &StoreLocation) -> Result<Connection, StorageError> {
        let conn = match location {
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StorageError::Database(e.to_string()))?;
                }
                let conn = Connection::open(path)?;
                initialize_schema(&conn, true)?;
                conn
            }
            StoreLocation::Memory => {
                let conn = Connection::open_in_memory()?;
                initialize_schema(&conn, false)?;
                conn
            }
        };
        Ok(conn)
    }

    fn connection(&self) -> Result<&Mutex<Connection>, StorageError> {
        self.conn.get().ok_or(StorageError::NotReady)
    }

    async fn try_read_question_set(&self) -> Result<Vec<QuestionRecord>, StorageError> {
        let conn = self.connection()?.lock().await;
        let raw = get_value(&conn, QUESTION_CACHE_KEY)
            .map_err(|e| StorageError::Read(e.to_string()))?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn try_last_sync_time(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let conn = self.connection()?.lock().await;
        let raw =
            get_value(&conn, LAST_SYNC_KEY).map_err(|e| StorageError::Read(e.to_string()))?;

        raw.map(|ts| {
            DateTime::parse_from_rfc3339(&ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StorageError::Read(e.to_string()))
        })
        .transpose()
    }

    async fn try_read_answered_entries(&self) -> Result<Vec<AnsweredQuestionEntry>, StorageError> {
        let conn = self.connection()?.lock().await;
        let raw = get_value(&conn, ANSWERED_QUESTIONS_KEY)
            .map_err(|e| StorageError::Read(e.to_string()))?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.conn
            .get_or_try_init(|| async {
                let conn = Self::open_connection(&self.location)?;
                info!("Structured store ready at {:?}", self.location);
                Ok::<_, StorageError>(Mutex::new(conn))
            })
            .await?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.conn.initialized()
    }

    async fn write_question_set(
        &self,
        questions: &[QuestionRecord],
    ) -> Result<CacheMetadata, StorageError> {
        let conn_lock = self.connection()?;
        validate_all(questions).map_err(StorageError::Validation)?;
        let payload = serde_json::to_string(questions)?;
        let metadata = CacheMetadata {
            last_sync_time: Utc::now(),
        };

        let mut conn = conn_lock.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Write(e.to_string()))?;
        put_value(&tx, QUESTION_CACHE_KEY, &payload)?;
        put_value(&tx, LAST_SYNC_KEY, &metadata.last_sync_time.to_rfc3339())?;
        tx.commit().map_err(|e| StorageError::Write(e.to_string()))?;

        debug!("Stored {} questions", questions.len());
        Ok(metadata)
    }

    async fn read_question_set(&self) -> Vec<QuestionRecord> {
        match self.try_read_question_set().await {
            Ok(questions) => questions,
            Err(e) => {
                warn!("Failed to read cached questions: {}", e);
                Vec::new()
            }
        }
    }

    async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        match self.try_last_sync_time().await {
            Ok(ts) => ts,
            Err(e) => {
                warn!("Failed to read last sync time: {}", e);
                None
            }
        }
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut conn = self.connection()?.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Write(e.to_string()))?;
        let deleted = tx
            .execute(
                "DELETE FROM kv_store WHERE key IN (?1, ?2)",
                [QUESTION_CACHE_KEY, LAST_SYNC_KEY],
            )
            .map_err(|e| StorageError::Write(e.to_string()))?;
        tx.commit().map_err(|e| StorageError::Write(e.to_string()))?;

        debug!("Cleared question cache ({} keys removed)", deleted);
        Ok(())
    }

    async fn append_answered_entry(
        &self,
        entry: &AnsweredQuestionEntry,
    ) -> Result<(), StorageError> {
        let mut conn = self.connection()?.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Write(e.to_string()))?;

        let mut history: VecDeque<AnsweredQuestionEntry> =
            match get_value(&tx, ANSWERED_QUESTIONS_KEY)? {
                Some(json) => match serde_json::from_str(&json) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("Discarding unreadable answer history: {}", e);
                        VecDeque::new()
                    }
                },
                None => VecDeque::new(),
            };

        history.push_back(entry.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }

        let payload = serde_json::to_string(&history)?;
        put_value(&tx, ANSWERED_QUESTIONS_KEY, &payload)?;
        tx.commit().map_err(|e| StorageError::Write(e.to_string()))?;

        Ok(())
    }

    async fn read_answered_entries(&self) -> Vec<AnsweredQuestionEntry> {
        match self.try_read_answered_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read answer history: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod sqlite_tests;
