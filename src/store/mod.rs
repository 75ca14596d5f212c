//! Structured local store
//!
//! Durable, asynchronous key-value persistence for the question set, its sync
//! metadata and the answer history. Three logical keys are used:
//!
//! ```text
//! question-cache      → JSON array of QuestionRecord
//! last-sync-time      → RFC 3339 timestamp, written with question-cache
//! answered-questions  → JSON ring buffer of AnsweredQuestionEntry
//! ```
//!
//! Reads never fail from the caller's point of view: a broken or missing value
//! degrades to an empty result because the bundled dataset backs every read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::questions::{AnsweredQuestionEntry, CacheMetadata, QuestionRecord};

pub mod sqlite;

pub use sqlite::SqliteStore;

pub const QUESTION_CACHE_KEY: &str = "question-cache";
pub const LAST_SYNC_KEY: &str = "last-sync-time";
pub const ANSWERED_QUESTIONS_KEY: &str = "answered-questions";

/// Default bound of the answer history ring buffer
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Storage backend for offline question data
///
/// Every operation other than [`initialize`](LocalStore::initialize) requires
/// the store to be initialized first. Writes issued before that fail with
/// [`StorageError::NotReady`]; reads return empty.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Idempotent setup. Concurrent callers wait on the same initialization.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Whether [`initialize`](LocalStore::initialize) has completed
    fn is_ready(&self) -> bool;

    /// Replace the stored question set and record the sync time in one transaction
    ///
    /// # Returns
    /// * `Ok(metadata)` with the recorded `last_sync_time`
    /// * `Err(_)` if the write was rejected; the previous contents are untouched
    async fn write_question_set(
        &self,
        questions: &[QuestionRecord],
    ) -> Result<CacheMetadata, StorageError>;

    /// Stored question set, or empty if never written or unreadable
    async fn read_question_set(&self) -> Vec<QuestionRecord>;

    /// Time of the last successful `write_question_set`
    async fn last_sync_time(&self) -> Option<DateTime<Utc>>;

    /// Delete the question set and its sync time together. No-op when empty.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Append to the answer history, evicting the oldest entries past the limit
    async fn append_answered_entry(&self, entry: &AnsweredQuestionEntry)
        -> Result<(), StorageError>;

    /// Whole answer history, oldest first, or empty on failure
    async fn read_answered_entries(&self) -> Vec<AnsweredQuestionEntry>;
}

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Operation issued before initialization completed
    #[error("Store not initialized")]
    NotReady,

    /// The medium rejected a write (quota, constraint, I/O)
    #[error("Write rejected: {0}")]
    Write(String),

    /// Stored value could not be read back
    #[error("Read failed: {0}")]
    Read(String),

    /// Records violate the data model constraints
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Opening or preparing the database failed
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
