use super::*;
use crate::questions::Difficulty;
use crate::test_utils::sample_questions;
use std::sync::Arc;
use tempfile::TempDir;

async fn ready_store() -> SqliteStore {
    let store = SqliteStore::in_memory();
    store.initialize().await.unwrap();
    store
}

#[test]
fn test_initialize_schema() {
    let conn = Connection::open_in_memory().unwrap();
    initialize_schema(&conn, false).unwrap();

    let tables: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(tables.contains(&"kv_store".to_string()));
}

#[test]
fn test_schema_wal_mode() {
    let temp_dir = TempDir::new().unwrap();
    let conn = Connection::open(temp_dir.path().join("wal.db")).unwrap();
    initialize_schema(&conn, true).unwrap();

    let journal_mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_operations_before_initialize() {
    let store = SqliteStore::in_memory();
    assert!(!store.is_ready());

    let result = store.write_question_set(&sample_questions(3)).await;
    assert!(matches!(result, Err(StorageError::NotReady)));

    assert!(matches!(store.clear().await, Err(StorageError::NotReady)));
    assert!(store.read_question_set().await.is_empty());
    assert!(store.read_answered_entries().await.is_empty());
    assert!(store.last_sync_time().await.is_none());
}

#[tokio::test]
async fn test_initialize_is_idempotent_under_concurrency() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("nested/offline.db")));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.initialize().await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(store.is_ready());
    store.initialize().await.unwrap();
}

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let store = ready_store().await;
    let questions = sample_questions(25);

    let before = Utc::now();
    let metadata = store.write_question_set(&questions).await.unwrap();

    assert_eq!(store.read_question_set().await, questions);
    assert!(metadata.last_sync_time >= before);
    assert_eq!(store.last_sync_time().await, Some(metadata.last_sync_time));
}

#[tokio::test]
async fn test_write_replaces_whole_set() {
    let store = ready_store().await;
    store.write_question_set(&sample_questions(10)).await.unwrap();

    let replacement: Vec<_> = sample_questions(3)
        .into_iter()
        .map(|mut q| {
            q.difficulty = Difficulty::Hard;
            q
        })
        .collect();
    store.write_question_set(&replacement).await.unwrap();

    assert_eq!(store.read_question_set().await, replacement);
}

#[tokio::test]
async fn test_invalid_set_leaves_cache_unchanged() {
    let store = ready_store().await;
    let original = sample_questions(4);
    let metadata = store.write_question_set(&original).await.unwrap();

    let mut broken = sample_questions(2);
    broken[1].answer = 9;
    let result = store.write_question_set(&broken).await;

    assert!(matches!(result, Err(StorageError::Validation(_))));
    assert_eq!(store.read_question_set().await, original);
    assert_eq!(store.last_sync_time().await, Some(metadata.last_sync_time));
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let store = ready_store().await;
    store.write_question_set(&sample_questions(5)).await.unwrap();

    store.clear().await.unwrap();
    assert!(store.read_question_set().await.is_empty());
    assert!(store.last_sync_time().await.is_none());

    store.clear().await.unwrap();
    assert!(store.read_question_set().await.is_empty());
    assert!(store.last_sync_time().await.is_none());
}

#[tokio::test]
async fn test_clear_keeps_answer_history() {
    let store = ready_store().await;
    store.write_question_set(&sample_questions(2)).await.unwrap();
    store
        .append_answered_entry(&AnsweredQuestionEntry::new("q-1", true, 3.0))
        .await
        .unwrap();

    store.clear().await.unwrap();

    assert_eq!(store.read_answered_entries().await.len(), 1);
}

#[tokio::test]
async fn test_answer_history_ring_buffer() {
    let store = ready_store().await;

    for i in 0..501 {
        let entry = AnsweredQuestionEntry::new(format!("q-{}", i), i % 2 == 0, 1.5);
        store.append_answered_entry(&entry).await.unwrap();
    }

    let entries = store.read_answered_entries().await;
    assert_eq!(entries.len(), 500);
    assert!(entries.iter().all(|e| e.question_id != "q-0"));

    let ids: Vec<_> = entries.iter().map(|e| e.question_id.clone()).collect();
    let expected: Vec<_> = (1..501).map(|i| format!("q-{}", i)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_custom_history_limit() {
    let store = SqliteStore::in_memory().with_history_limit(3);
    store.initialize().await.unwrap();

    for i in 0..5 {
        store
            .append_answered_entry(&AnsweredQuestionEntry::new(format!("q-{}", i), true, 2.0))
            .await
            .unwrap();
    }

    let ids: Vec<_> = store
        .read_answered_entries()
        .await
        .into_iter()
        .map(|e| e.question_id)
        .collect();
    assert_eq!(ids, vec!["q-2", "q-3", "q-4"]);
}

#[tokio::test]
async fn test_corrupt_question_cache_reads_empty() {
    let store = ready_store().await;
    {
        let conn = store.connection().unwrap().lock().await;
        put_value(&conn, QUESTION_CACHE_KEY, "{not json").unwrap();
    }

    assert!(store.read_question_set().await.is_empty());
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("offline.db");
    let questions = sample_questions(7);

    {
        let store = SqliteStore::open(&path);
        store.initialize().await.unwrap();
        store.write_question_set(&questions).await.unwrap();
    }

    let reopened = SqliteStore::open(&path);
    reopened.initialize().await.unwrap();
    assert_eq!(reopened.read_question_set().await, questions);
    assert!(reopened.last_sync_time().await.is_some());
}
