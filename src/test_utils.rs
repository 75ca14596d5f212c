//! Test doubles shared by unit tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::questions::{
    AnsweredQuestionEntry, CacheMetadata, Difficulty, QuestionRecord, QuestionSource, SourceError,
};
use crate::store::{LocalStore, SqliteStore, StorageError};
use crate::worker::{Network, NetworkFetchError, Request, Response};

pub fn sample_questions(count: usize) -> Vec<QuestionRecord> {
    (0..count)
        .map(|i| QuestionRecord {
            id: format!("q-{:04}", i),
            difficulty: Difficulty::ALL[i % Difficulty::ALL.len()],
            question: format!("Sample question {}?", i),
            options: (0..(2 + i % 5)).map(|o| format!("option {}", o)).collect(),
            answer: i % 2,
            reference: format!("Ref {}:{}", i / 10 + 1, i % 10 + 1),
            explanation: String::new(),
            category: "sample".to_string(),
        })
        .collect()
}

/// Network double: serves registered paths, counts every call
#[derive(Default)]
pub struct FakeNetwork {
    responses: DashMap<String, Response>,
    offline: AtomicBool,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the default essential resources
    pub fn with_app_shell() -> Self {
        let network = Self::new();
        network.add("/", Response::ok("<html>root</html>"));
        network.add("/index.html", Response::ok("<html>index</html>"));
        network.add("/manifest.json", Response::ok("{\"name\":\"trivia\"}"));
        network
    }

    pub fn add(&self, path: &str, response: Response) {
        self.responses.insert(path.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.requested.lock().unwrap().clear();
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkFetchError::Offline("simulated offline".to_string()));
        }

        Ok(self
            .responses
            .get(&request.url)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| Response::new(http::StatusCode::NOT_FOUND, "")))
    }
}

/// In-memory SQLite store whose writes can be made to fail
pub struct FlakyStore {
    inner: SqliteStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("quota exceeded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FlakyStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.inner.initialize().await
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    async fn write_question_set(
        &self,
        questions: &[QuestionRecord],
    ) -> Result<CacheMetadata, StorageError> {
        if !self.inner.is_ready() {
            return Err(StorageError::NotReady);
        }
        self.check_write()?;
        self.inner.write_question_set(questions).await
    }

    async fn read_question_set(&self) -> Vec<QuestionRecord> {
        self.inner.read_question_set().await
    }

    async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.last_sync_time().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_write()?;
        self.inner.clear().await
    }

    async fn append_answered_entry(
        &self,
        entry: &AnsweredQuestionEntry,
    ) -> Result<(), StorageError> {
        self.check_write()?;
        self.inner.append_answered_entry(entry).await
    }

    async fn read_answered_entries(&self) -> Vec<AnsweredQuestionEntry> {
        self.inner.read_answered_entries().await
    }
}

/// Question source returning a fixed list and counting calls
pub struct StaticSource {
    questions: Mutex<Vec<QuestionRecord>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(questions: Vec<QuestionRecord>) -> Self {
        Self {
            questions: Mutex::new(questions),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_questions(&self, questions: Vec<QuestionRecord>) {
        *self.questions.lock().unwrap() = questions;
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    async fn fetch_all(&self) -> Result<Vec<QuestionRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Request("simulated outage".to_string()));
        }
        Ok(self.questions.lock().unwrap().clone())
    }
}
