//! Offline orchestrator
//!
//! The single integration point for consumers. It answers two questions for
//! the rest of the game, "which questions do I play with" and "is offline
//! data available", and keeps the local replica in step with the remote
//! source.
//!
//! # Status
//!
//! Two independent axes, every combination valid:
//!
//! ```text
//! Connectivity: Unknown → Online | Offline   (connectivity monitor)
//! Cache:        NotCached | Cached           (store content, refreshed on start/download/clear)
//! ```
//!
//! # Resynchronization
//!
//! When connectivity returns and data was cached, a full re-download is
//! scheduled after a short debounce. Going offline again before it fires
//! cancels it, so flapping connectivity triggers at most one sync.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, OnceCell};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::connectivity::Subscription;
use crate::context::OfflineContext;
use crate::questions::{
    AnsweredQuestionEntry, FallbackDataset, QuestionRecord, QuestionSource, SourceError,
};
use crate::store::StorageError;
use crate::worker::{
    AssetCacheController, RegistrationOutcome, UpdateEvent, WorkerError, WorkerMessage,
    WorkerRegistration,
};

pub mod debounce;

pub use debounce::Debouncer;

#[derive(Debug, thiserror::Error)]
pub enum OfflineError {
    /// The store has not finished initializing
    #[error("Offline cache not ready: store is not initialized")]
    CacheNotReady,

    /// The store rejected the write; the previous cache is intact
    #[error("Failed to write offline cache: {0}")]
    StorageWrite(StorageError),

    #[error("Failed to fetch questions: {0}")]
    Source(#[from] SourceError),

    #[error("Store initialization failed: {0}")]
    Initialization(StorageError),
}

impl From<StorageError> for OfflineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotReady => OfflineError::CacheNotReady,
            other => OfflineError::StorageWrite(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Connectivity {
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheState {
    NotCached,
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStatus {
    pub connectivity: Connectivity,
    pub cache: CacheState,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Asks the user whether to reload into a newly installed worker version
#[async_trait]
pub trait ReloadPrompt: Send + Sync {
    async fn confirm_reload(&self, version: &str) -> bool;
}

/// Accepts every update without asking
pub struct AutoReload;

#[async_trait]
impl ReloadPrompt for AutoReload {
    async fn confirm_reload(&self, _version: &str) -> bool {
        true
    }
}

pub struct OfflineOrchestrator {
    context: Arc<OfflineContext>,
    source: Arc<dyn QuestionSource>,
    fallback: FallbackDataset,
    settings: SyncConfig,
    data_cached: AtomicBool,
    started: AtomicBool,
    debouncer: Debouncer,
    runtime: OnceLock<Handle>,
    subscription: Mutex<Option<Subscription>>,
    worker_registered: OnceCell<()>,
}

impl OfflineOrchestrator {
    pub fn new(
        context: Arc<OfflineContext>,
        source: Arc<dyn QuestionSource>,
        fallback: FallbackDataset,
        settings: SyncConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            debouncer: Debouncer::new(settings.debounce()),
            context,
            source,
            fallback,
            settings,
            data_cached: AtomicBool::new(false),
            started: AtomicBool::new(false),
            runtime: OnceLock::new(),
            subscription: Mutex::new(None),
            worker_registered: OnceCell::new(),
        })
    }

    /// Initialize the store, compute the cache state and follow connectivity
    pub async fn start(self: &Arc<Self>) -> Result<(), OfflineError> {
        self.context
            .store
            .initialize()
            .await
            .map_err(OfflineError::Initialization)?;
        self.refresh_cache_state().await;

        let _ = self.runtime.set(Handle::current());

        if self.settings.auto_sync {
            let weak = Arc::downgrade(self);
            let subscription = self.context.connectivity.on_change(move |online| {
                if let Some(orchestrator) = weak.upgrade() {
                    orchestrator.handle_connectivity_change(online);
                }
            });
            *self.lock_subscription() = Some(subscription);
        }

        self.started.store(true, Ordering::SeqCst);
        info!(
            "Offline orchestrator started (online: {}, cached: {})",
            self.context.connectivity.is_online(),
            self.is_data_cached()
        );
        Ok(())
    }

    /// Stop following connectivity and drop any pending sync
    pub fn stop(&self) {
        self.lock_subscription().take();
        self.debouncer.cancel();
        self.started.store(false, Ordering::SeqCst);
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn context(&self) -> &Arc<OfflineContext> {
        &self.context
    }

    pub fn is_offline(&self) -> bool {
        self.context.connectivity.is_offline()
    }

    pub fn is_data_cached(&self) -> bool {
        self.data_cached.load(Ordering::SeqCst)
    }

    pub fn is_sync_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub async fn status(&self) -> OfflineStatus {
        let connectivity = if !self.started.load(Ordering::SeqCst) {
            Connectivity::Unknown
        } else if self.context.connectivity.is_online() {
            Connectivity::Online
        } else {
            Connectivity::Offline
        };

        OfflineStatus {
            connectivity,
            cache: if self.is_data_cached() {
                CacheState::Cached
            } else {
                CacheState::NotCached
            },
            last_sync_time: self.context.store.last_sync_time().await,
        }
    }

    /// Recompute `is_data_cached` from the store contents
    pub async fn refresh_cache_state(&self) -> bool {
        let cached = !self.context.store.read_question_set().await.is_empty();
        self.data_cached.store(cached, Ordering::SeqCst);
        cached
    }

    /// Pull the full question list and replace the local cache with it
    ///
    /// # Returns
    /// * `Ok(count)` of stored questions; `is_data_cached` is true unless the list was empty
    /// * `Err(CacheNotReady)` if the store is not initialized
    /// * `Err(Source | StorageWrite)` otherwise; `is_data_cached` is unchanged
    pub async fn download_for_offline(&self) -> Result<usize, OfflineError> {
        let result = self.download().await;
        self.context.metrics.record_download(result.is_ok());
        result
    }

    async fn download(&self) -> Result<usize, OfflineError> {
        if !self.context.store.is_ready() {
            return Err(OfflineError::CacheNotReady);
        }

        let questions = self.source.fetch_all().await?;
        let metadata = self.context.store.write_question_set(&questions).await?;
        self.data_cached.store(!questions.is_empty(), Ordering::SeqCst);

        info!(
            "Cached {} questions for offline play (synced at {})",
            questions.len(),
            metadata.last_sync_time
        );

        self.post_snapshot(&questions).await;
        Ok(questions.len())
    }

    /// Mirror the question set into the worker's offline cache
    async fn post_snapshot(&self, questions: &[QuestionRecord]) {
        if self.context.registration.active().await.is_none() {
            return;
        }

        let payload = match serde_json::to_value(questions) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize question snapshot: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .context
            .registration
            .post_message(WorkerMessage::CacheQuestions { questions: payload })
            .await
        {
            warn!("Failed to store question snapshot in worker: {}", e);
        }
    }

    /// Cached questions, or the bundled dataset when nothing is cached
    ///
    /// Never fails and never returns an empty list.
    pub async fn load_offline_questions(&self) -> Vec<QuestionRecord> {
        let cached = self.context.store.read_question_set().await;
        if !cached.is_empty() {
            debug!("Loaded {} questions from offline cache", cached.len());
            return cached;
        }

        debug!(
            "Offline cache empty, using {} bundled questions",
            self.fallback.len()
        );
        self.fallback.to_vec()
    }

    pub async fn clear_offline_cache(&self) -> Result<(), OfflineError> {
        self.context.store.clear().await?;
        self.data_cached.store(false, Ordering::SeqCst);
        info!("Offline question cache cleared");
        Ok(())
    }

    /// Background full re-download; failures are logged, never returned
    ///
    /// # Returns
    /// * `true` if the cache was refreshed
    pub async fn sync_data(&self) -> bool {
        self.context.metrics.record_sync_started();
        if self.context.connectivity.is_offline() {
            debug!("Skipping sync while offline");
            return false;
        }
        if !self.context.store.is_ready() {
            debug!("Skipping sync, store not initialized");
            return false;
        }

        info!("Resynchronizing offline questions");
        match self.download_for_offline().await {
            Ok(count) => {
                debug!("Sync refreshed {} questions", count);
                true
            }
            Err(e) => {
                self.context.metrics.record_sync_failed();
                warn!("Background sync failed, keeping previous cache: {}", e);
                false
            }
        }
    }

    /// React to a connectivity transition
    pub fn handle_connectivity_change(self: &Arc<Self>, online: bool) {
        if !online {
            if self.debouncer.cancel() {
                debug!("Went offline, pending sync cancelled");
            }
            return;
        }

        if !self.settings.auto_sync || !self.is_data_cached() {
            return;
        }

        let Some(runtime) = self.runtime.get() else {
            debug!("Orchestrator not started, not scheduling sync");
            return;
        };

        debug!(
            "Back online, scheduling sync in {:?}",
            self.debouncer.delay()
        );
        let weak = Arc::downgrade(self);
        self.debouncer.schedule(runtime, async move {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.sync_data().await;
            }
        });
    }

    pub async fn record_answer(&self, entry: &AnsweredQuestionEntry) -> Result<(), OfflineError> {
        self.context.store.append_answered_entry(entry).await?;
        Ok(())
    }

    pub async fn answer_history(&self) -> Vec<AnsweredQuestionEntry> {
        self.context.store.read_answered_entries().await
    }

    /// Register the asset cache controller for this context
    ///
    /// Only the first call registers; later calls are no-ops returning
    /// `false`. Newer versions installed afterwards through the registration
    /// raise `UpdateReady`, and `prompt` decides whether to activate them.
    pub async fn register_worker(
        &self,
        controller: Arc<AssetCacheController>,
        prompt: Arc<dyn ReloadPrompt>,
    ) -> Result<bool, WorkerError> {
        if self.worker_registered.initialized() {
            return Ok(false);
        }

        let registration = self.context.registration.clone();
        let shutdown = self.context.subscribe_shutdown();
        self.worker_registered
            .get_or_try_init(|| async move {
                let events = registration.subscribe();
                let outcome = registration.register(controller).await?;
                if outcome == RegistrationOutcome::Waiting {
                    debug!("Registered worker is waiting behind an active version");
                }
                tokio::spawn(watch_for_updates(registration, events, shutdown, prompt));
                Ok::<_, WorkerError>(())
            })
            .await?;

        Ok(true)
    }
}

async fn watch_for_updates(
    registration: Arc<WorkerRegistration>,
    mut events: broadcast::Receiver<UpdateEvent>,
    mut shutdown: broadcast::Receiver<()>,
    prompt: Arc<dyn ReloadPrompt>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.recv() => {
                debug!("Update watcher stopping due to shutdown");
                break;
            }
        };

        match event {
            Ok(UpdateEvent::UpdateReady { version }) => {
                info!("Worker {} is ready, asking to reload", version);
                if !prompt.confirm_reload(&version).await {
                    debug!("Reload into {} declined", version);
                    continue;
                }
                match registration.skip_waiting().await {
                    Ok(true) => info!("Reloaded into worker {}", version),
                    Ok(false) => debug!("No waiting worker to activate"),
                    Err(e) => error!("Failed to activate worker {}: {}", version, e),
                }
            }
            Ok(UpdateEvent::InstallFailed { version, reason }) => {
                warn!("Worker {} failed to install: {}", version, reason);
            }
            Ok(UpdateEvent::Activated { version }) => {
                debug!("Worker {} active", version);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Update watcher lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
