//! Shared handles for one running game context
//!
//! Bundles the store, the cache storage, the worker registration and the
//! connectivity monitor so the orchestrator and the CLI see the same
//! instances.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::{Config, WorkerConfig};
use crate::connectivity::ConnectivityMonitor;
use crate::metrics::Metrics;
use crate::store::{LocalStore, SqliteStore, StorageError};
use crate::worker::{AssetCacheController, CacheStorage, Network, WorkerRegistration};

pub struct OfflineContext {
    pub store: Arc<dyn LocalStore>,
    pub caches: Arc<CacheStorage>,
    pub registration: Arc<WorkerRegistration>,
    pub connectivity: ConnectivityMonitor,
    pub metrics: Arc<Metrics>,
    shutdown_tx: broadcast::Sender<()>,
}

impl OfflineContext {
    pub fn new(store: Arc<dyn LocalStore>, connectivity: ConnectivityMonitor) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            caches: Arc::new(CacheStorage::new()),
            registration: Arc::new(WorkerRegistration::default()),
            connectivity,
            metrics: Arc::new(Metrics::new()),
            shutdown_tx,
        }
    }

    /// Context backed by the SQLite file named in the store settings
    pub fn from_config(config: &Config, initially_online: bool) -> Result<Self, StorageError> {
        let store = SqliteStore::from_config(&config.store)?;
        Ok(Self::new(
            Arc::new(store),
            ConnectivityMonitor::new(initially_online),
        ))
    }

    /// A controller for `config` sharing this context's caches and metrics
    pub fn build_controller(
        &self,
        config: &WorkerConfig,
        network: Arc<dyn Network>,
    ) -> Arc<AssetCacheController> {
        Arc::new(AssetCacheController::new(
            config,
            self.caches.clone(),
            network,
            self.metrics.clone(),
        ))
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown(&self) {
        info!("Shutting down offline context");
        let _ = self.shutdown_tx.send(());
    }
}
