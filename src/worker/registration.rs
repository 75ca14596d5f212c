//! Worker registration and the self-update flow
//!
//! The page registers one controller. A later registration with a newer
//! version installs next to the active one and waits; the page is told an
//! update is ready and decides when to skip waiting.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use super::controller::{AssetCacheController, MessageOutcome, WorkerMessage};
use super::fetch::{Request, Response};
use super::WorkerError;

pub const DEFAULT_SCRIPT_PATH: &str = "/sw.js";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A version became the active controller
    Activated { version: String },
    /// A newer version is installed and waiting
    UpdateReady { version: String },
    /// A version failed to install; the previous one keeps serving
    InstallFailed { version: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Activated,
    Waiting,
}

pub struct WorkerRegistration {
    script_path: String,
    active: RwLock<Option<Arc<AssetCacheController>>>,
    waiting: RwLock<Option<Arc<AssetCacheController>>>,
    events: broadcast::Sender<UpdateEvent>,
}

impl Default for WorkerRegistration {
    fn default() -> Self {
        Self::new(DEFAULT_SCRIPT_PATH)
    }
}

impl WorkerRegistration {
    pub fn new(script_path: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            script_path: script_path.into(),
            active: RwLock::new(None),
            waiting: RwLock::new(None),
            events,
        }
    }

    pub fn script_path(&self) -> &str {
        &self.script_path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: UpdateEvent) {
        // No listeners is fine
        let _ = self.events.send(event);
    }

    pub async fn active(&self) -> Option<Arc<AssetCacheController>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<AssetCacheController>> {
        self.waiting.read().await.clone()
    }

    /// Install a controller version
    ///
    /// With no active controller it activates immediately. Otherwise it waits
    /// until [`skip_waiting`](Self::skip_waiting) is called.
    pub async fn register(
        &self,
        controller: Arc<AssetCacheController>,
    ) -> Result<RegistrationOutcome, WorkerError> {
        let version = controller.version().to_string();
        info!("Registering worker {} at {}", version, self.script_path);

        if let Err(e) = controller.install().await {
            self.emit(UpdateEvent::InstallFailed {
                version,
                reason: e.to_string(),
            });
            return Err(e);
        }

        let mut active = self.active.write().await;
        if active.is_none() {
            controller.activate().await?;
            *active = Some(controller);
            drop(active);
            self.emit(UpdateEvent::Activated { version });
            return Ok(RegistrationOutcome::Activated);
        }
        drop(active);

        let mut waiting = self.waiting.write().await;
        if let Some(previous) = waiting.replace(controller) {
            previous.retire().await;
        }
        drop(waiting);

        info!("Worker {} installed and waiting", version);
        self.emit(UpdateEvent::UpdateReady { version });
        Ok(RegistrationOutcome::Waiting)
    }

    /// Promote the waiting controller, if any
    pub async fn skip_waiting(&self) -> Result<bool, WorkerError> {
        let mut waiting = self.waiting.write().await;
        let Some(next) = waiting.take() else {
            return Ok(false);
        };

        match next.handle_message(WorkerMessage::SkipWaiting).await {
            Ok(MessageOutcome::Activated) => drop(waiting),
            Err(e) => {
                warn!("Waiting worker {} failed to activate: {}", next.version(), e);
                *waiting = Some(next);
                return Err(e);
            }
            Ok(outcome) => {
                drop(waiting);
                warn!(
                    "Waiting worker {} did not activate: {:?}",
                    next.version(),
                    outcome
                );
                return Ok(false);
            }
        }

        let version = next.version().to_string();
        let previous = self.active.write().await.replace(next);
        if let Some(previous) = previous {
            previous.retire().await;
        }

        self.emit(UpdateEvent::Activated { version });
        Ok(true)
    }

    /// Route a request through the active controller
    ///
    /// `None` means no controller is serving and the page goes to network.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
        let active = self.active().await?;
        Some(active.handle_fetch(request).await)
    }

    pub async fn post_message(
        &self,
        message: WorkerMessage,
    ) -> Result<MessageOutcome, WorkerError> {
        let active = self.active().await.ok_or(WorkerError::NoActiveWorker)?;
        active.handle_message(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::metrics::Metrics;
    use crate::test_utils::FakeNetwork;
    use crate::worker::controller::WorkerState;
    use crate::worker::CacheStorage;

    fn controller(
        version: &str,
        caches: &Arc<CacheStorage>,
        network: &Arc<FakeNetwork>,
    ) -> Arc<AssetCacheController> {
        let config = WorkerConfig::default().with_version(version);
        Arc::new(AssetCacheController::new(
            &config,
            caches.clone(),
            network.clone(),
            Arc::new(Metrics::new()),
        ))
    }

    #[tokio::test]
    async fn test_first_registration_activates() {
        let caches = Arc::new(CacheStorage::new());
        let network = Arc::new(FakeNetwork::with_app_shell());
        let registration = WorkerRegistration::default();
        let mut events = registration.subscribe();

        let outcome = registration
            .register(controller("v1", &caches, &network))
            .await
            .unwrap();

        assert_eq!(outcome, RegistrationOutcome::Activated);
        assert_eq!(
            events.recv().await.unwrap(),
            UpdateEvent::Activated {
                version: "v1".to_string()
            }
        );
        let active = registration.active().await.unwrap();
        assert_eq!(active.state().await, WorkerState::Activated);
        assert!(active.clients_claimed());
    }

    #[tokio::test]
    async fn test_update_waits_then_skip_waiting_promotes() {
        let caches = Arc::new(CacheStorage::new());
        let network = Arc::new(FakeNetwork::with_app_shell());
        let registration = WorkerRegistration::default();

        let v1 = controller("v1", &caches, &network);
        registration.register(v1.clone()).await.unwrap();

        let mut events = registration.subscribe();
        let outcome = registration
            .register(controller("v2", &caches, &network))
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Waiting);
        assert_eq!(
            events.recv().await.unwrap(),
            UpdateEvent::UpdateReady {
                version: "v2".to_string()
            }
        );
        assert_eq!(registration.active().await.unwrap().version(), "v1");

        assert!(registration.skip_waiting().await.unwrap());

        let active = registration.active().await.unwrap();
        assert_eq!(active.version(), "v2");
        assert_eq!(v1.state().await, WorkerState::Redundant);
        assert!(registration.waiting().await.is_none());
        assert!(!caches.has("trivia-shell-v1"));
        assert!(caches.has("trivia-shell-v2"));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_worker() {
        let caches = Arc::new(CacheStorage::new());
        let network = Arc::new(FakeNetwork::with_app_shell());
        let registration = WorkerRegistration::default();
        registration
            .register(controller("v1", &caches, &network))
            .await
            .unwrap();

        network.set_offline(true);
        let mut events = registration.subscribe();
        let result = registration
            .register(controller("v2", &caches, &network))
            .await;

        assert!(matches!(result, Err(WorkerError::InstallFailed { .. })));
        assert!(matches!(
            events.recv().await.unwrap(),
            UpdateEvent::InstallFailed { .. }
        ));
        assert_eq!(registration.active().await.unwrap().version(), "v1");
        assert!(registration.waiting().await.is_none());

        let response = registration
            .handle_fetch(&Request::navigate("/index.html"))
            .await
            .unwrap();
        assert!(response.is_cacheable());
    }

    #[tokio::test]
    async fn test_failed_activation_keeps_waiting_worker() {
        let caches = Arc::new(CacheStorage::new());
        let network = Arc::new(FakeNetwork::with_app_shell());
        let registration = WorkerRegistration::default();
        registration
            .register(controller("v1", &caches, &network))
            .await
            .unwrap();
        let v2 = controller("v2", &caches, &network);
        registration.register(v2.clone()).await.unwrap();

        caches.delete("trivia-shell-v2");
        let result = registration.skip_waiting().await;

        assert!(matches!(result, Err(WorkerError::ShellEvicted { .. })));
        assert_eq!(registration.active().await.unwrap().version(), "v1");
        let waiting = registration.waiting().await.unwrap();
        assert_eq!(waiting.version(), "v2");
        assert_eq!(waiting.state().await, WorkerState::Installed);
        assert!(caches.has("trivia-shell-v1"));
    }

    #[tokio::test]
    async fn test_skip_waiting_without_update() {
        let registration = WorkerRegistration::default();
        assert!(!registration.skip_waiting().await.unwrap());
        assert!(registration
            .handle_fetch(&Request::get("/index.html"))
            .await
            .is_none());
        assert!(matches!(
            registration.post_message(WorkerMessage::SkipWaiting).await,
            Err(WorkerError::NoActiveWorker)
        ));
    }
}
