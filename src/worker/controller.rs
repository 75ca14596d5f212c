//! Asset cache controller
//!
//! Background worker that keeps the application shell available offline.
//!
//! # Lifecycle
//!
//! ```text
//! Parsed → Installing → Installed (waiting) → Activating → Activated
//!              │
//!              └─ any essential fetch fails ─→ Redundant
//! ```
//!
//! - **Install** fetches every essential resource and commits them to the
//!   versioned app-shell cache only if all of them succeeded.
//! - **Activate** deletes every cache generation that is not one of this
//!   version's two names, then claims the open pages.
//! - **Serve** answers GET requests cache-first, writes cacheable network
//!   responses back, and never fails: network errors resolve to the cached
//!   fallback page for navigations or an error response otherwise.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::cache_storage::CacheStorage;
use super::fetch::{Request, Response};
use super::network::Network;
use super::WorkerError;
use crate::config::WorkerConfig;
use crate::metrics::Metrics;
use crate::questions::QuestionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Out-of-band commands posted by the hosting page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Store an arbitrary JSON payload as the offline question snapshot
    CacheQuestions { questions: serde_json::Value },
    /// Activate immediately instead of waiting for pages to close
    SkipWaiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    QuestionsCached,
    Activated,
    /// Not waiting, nothing to skip
    Ignored,
}

/// The two cache names owned by one worker version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub shell: String,
    pub offline: String,
}

impl CacheNames {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            shell: config.shell_cache_name(),
            offline: config.offline_cache_name(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        name == self.shell || name == self.offline
    }
}

pub struct AssetCacheController {
    version: String,
    names: CacheNames,
    essential_resources: Vec<String>,
    fallback_page: String,
    offline_questions_key: String,
    caches: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    metrics: Arc<Metrics>,
    state: RwLock<WorkerState>,
    clients_claimed: AtomicBool,
}

impl AssetCacheController {
    pub fn new(
        config: &WorkerConfig,
        caches: Arc<CacheStorage>,
        network: Arc<dyn Network>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            version: config.version.clone(),
            names: CacheNames::from_config(config),
            essential_resources: config.essential_resources.clone(),
            fallback_page: config.fallback_page.clone(),
            offline_questions_key: config.offline_questions_key.clone(),
            caches,
            network,
            metrics,
            state: RwLock::new(WorkerState::Parsed),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    pub fn essential_resources(&self) -> &[String] {
        &self.essential_resources
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    async fn transition(&self, expected: &[WorkerState], next: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;
        if !expected.contains(&*state) {
            return Err(WorkerError::InvalidState {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", *state),
            });
        }
        debug!("Worker {}: {:?} -> {:?}", self.version, *state, next);
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }

    /// Pre-cache every essential resource into the app-shell cache
    ///
    /// Nothing is written unless every fetch returns a successful response.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing)
            .await?;
        info!(
            "Installing worker {} ({} essential resources)",
            self.version,
            self.essential_resources.len()
        );

        let mut fetched = Vec::with_capacity(self.essential_resources.len());
        for resource in &self.essential_resources {
            let request = Request::get(resource.as_str());
            let result = self.network.fetch(&request).await;
            self.metrics.record_network_fetch(result.is_ok());

            let failure = match result {
                Ok(response) if response.status.is_success() && !response.is_error() => {
                    fetched.push((resource.clone(), response));
                    continue;
                }
                Ok(response) => format!("status {}", response.status),
                Err(e) => e.to_string(),
            };

            warn!(
                "Install of worker {} failed on {}: {}",
                self.version, resource, failure
            );
            self.set_state(WorkerState::Redundant).await;
            return Err(WorkerError::InstallFailed {
                resource: resource.clone(),
                reason: failure,
            });
        }

        self.caches.open(&self.names.shell).put_all(fetched);
        self.transition(&[WorkerState::Installing], WorkerState::Installed)
            .await?;
        info!("Worker {} installed", self.version);
        Ok(())
    }

    /// Delete stale cache generations and take control of open pages
    ///
    /// # Returns
    /// * `Ok(names)` of the deleted caches
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)
            .await?;

        // Never take control without a complete app shell
        let shell = self.caches.get(&self.names.shell);
        if let Some(missing) = self.essential_resources.iter().find(|resource| {
            !shell
                .as_ref()
                .is_some_and(|cache| cache.contains(resource.as_str()))
        }) {
            warn!(
                "Worker {} cannot activate, {} was evicted from {}",
                self.version, missing, self.names.shell
            );
            self.set_state(WorkerState::Installed).await;
            return Err(WorkerError::ShellEvicted {
                resource: missing.clone(),
            });
        }

        let mut deleted = Vec::new();
        for name in self.caches.names() {
            if !self.names.contains(&name) && self.caches.delete(&name) {
                info!("Deleting stale cache generation: {}", name);
                deleted.push(name);
            }
        }
        self.metrics.record_generations_deleted(deleted.len());

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.transition(&[WorkerState::Activating], WorkerState::Activated)
            .await?;
        info!("Worker {} activated and controlling pages", self.version);

        Ok(deleted)
    }

    /// Mark this version as replaced by a newer one
    pub async fn retire(&self) {
        self.clients_claimed.store(false, Ordering::SeqCst);
        self.set_state(WorkerState::Redundant).await;
    }

    /// Answer an intercepted request; always resolves to some response
    pub async fn handle_fetch(&self, request: &Request) -> Response {
        if request.method != http::Method::GET {
            return match self.network.fetch(request).await {
                Ok(response) => {
                    self.metrics.record_network_fetch(true);
                    response
                }
                Err(e) => {
                    self.metrics.record_network_fetch(false);
                    debug!("{} {} failed: {}", request.method, request.url, e);
                    self.metrics.record_fallback_response();
                    Response::network_error()
                }
            };
        }

        let key = request.cache_key();
        let current = [self.names.shell.as_str(), self.names.offline.as_str()];
        if let Some(cached) = self.caches.match_in(&current, key) {
            self.metrics.record_cache_lookup(true);
            return cached;
        }
        self.metrics.record_cache_lookup(false);

        match self.network.fetch(request).await {
            Ok(response) => {
                self.metrics.record_network_fetch(true);
                if response.is_cacheable() {
                    self.caches
                        .open(&self.names.shell)
                        .put(key, response.clone());
                }
                response
            }
            Err(e) => {
                self.metrics.record_network_fetch(false);
                self.metrics.record_fallback_response();
                debug!("Fetch of {} failed, serving fallback: {}", key, e);
                self.offline_fallback(request)
            }
        }
    }

    fn offline_fallback(&self, request: &Request) -> Response {
        if request.is_navigation() {
            if let Some(page) = self
                .caches
                .get(&self.names.shell)
                .and_then(|cache| cache.get(&self.fallback_page))
            {
                return page;
            }
            warn!("No cached fallback page for navigation to {}", request.url);
        }
        Response::network_error()
    }

    pub async fn handle_message(
        &self,
        message: WorkerMessage,
    ) -> Result<MessageOutcome, WorkerError> {
        match message {
            WorkerMessage::CacheQuestions { questions } => {
                let response = Response::json(&questions)
                    .map_err(|e| WorkerError::InvalidMessage(e.to_string()))?;
                self.caches
                    .open(&self.names.offline)
                    .put(self.offline_questions_key.as_str(), response);
                debug!("Stored offline question snapshot in {}", self.names.offline);
                Ok(MessageOutcome::QuestionsCached)
            }
            WorkerMessage::SkipWaiting => {
                if self.state().await != WorkerState::Installed {
                    return Ok(MessageOutcome::Ignored);
                }
                self.activate().await?;
                Ok(MessageOutcome::Activated)
            }
        }
    }

    /// Parse and dispatch a raw JSON message from the page
    pub async fn post_message(&self, raw: &str) -> Result<MessageOutcome, WorkerError> {
        let message: WorkerMessage =
            serde_json::from_str(raw).map_err(|e| WorkerError::InvalidMessage(e.to_string()))?;
        self.handle_message(message).await
    }

    /// The question snapshot stored by `CACHE_QUESTIONS`, if any
    pub fn cached_questions_snapshot(&self) -> Option<Vec<QuestionRecord>> {
        let response = self
            .caches
            .get(&self.names.offline)?
            .get(&self.offline_questions_key)?;
        match serde_json::from_slice(&response.body) {
            Ok(questions) => Some(questions),
            Err(e) => {
                warn!("Offline question snapshot is not a question list: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
