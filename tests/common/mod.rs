#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use trivia_offline::config::SyncConfig;
use trivia_offline::connectivity::ConnectivityMonitor;
use trivia_offline::context::OfflineContext;
use trivia_offline::orchestrator::OfflineOrchestrator;
use trivia_offline::questions::{
    Difficulty, FallbackDataset, QuestionRecord, QuestionSource, SourceError,
};
use trivia_offline::store::{LocalStore, SqliteStore};
use trivia_offline::worker::{Network, NetworkFetchError, Request, Response};

pub fn questions(count: usize, prefix: &str) -> Vec<QuestionRecord> {
    (0..count)
        .map(|i| QuestionRecord {
            id: format!("{}-{:04}", prefix, i),
            difficulty: Difficulty::ALL[i % Difficulty::ALL.len()],
            question: format!("Question {} from {}?", i, prefix),
            options: vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string(),
                "fourth".to_string(),
            ],
            answer: i % 4,
            reference: format!("Book {}:{}", i / 20 + 1, i % 20 + 1),
            explanation: format!("Explanation {}", i),
            category: "integration".to_string(),
        })
        .collect()
}

pub struct CountingNetwork {
    responses: DashMap<String, Response>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl CountingNetwork {
    pub fn app_shell() -> Self {
        let network = Self {
            responses: DashMap::new(),
            offline: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        };
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

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for CountingNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkFetchError::Offline("connection refused".to_string()));
        }
        Ok(self
            .responses
            .get(&request.url)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| Response::new(http::StatusCode::NOT_FOUND, "")))
    }
}

pub struct RemoteFixture {
    questions: Mutex<Vec<QuestionRecord>>,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl RemoteFixture {
    pub fn new(questions: Vec<QuestionRecord>) -> Self {
        Self {
            questions: Mutex::new(questions),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let fixture = Self::new(Vec::new());
        fixture.available.store(false, Ordering::SeqCst);
        fixture
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for RemoteFixture {
    async fn fetch_all(&self) -> Result<Vec<QuestionRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(SourceError::Request("connection refused".to_string()));
        }
        Ok(self.questions.lock().unwrap().clone())
    }
}

pub fn orchestrator_with(
    store: Arc<dyn LocalStore>,
    source: Arc<dyn QuestionSource>,
    fallback: FallbackDataset,
    online: bool,
) -> Arc<OfflineOrchestrator> {
    let context = Arc::new(OfflineContext::new(store, ConnectivityMonitor::new(online)));
    OfflineOrchestrator::new(context, source, fallback, SyncConfig::default())
}

pub fn in_memory_orchestrator(
    source: Arc<dyn QuestionSource>,
    online: bool,
) -> Arc<OfflineOrchestrator> {
    orchestrator_with(
        Arc::new(SqliteStore::in_memory()),
        source,
        FallbackDataset::bundled(),
        online,
    )
}
