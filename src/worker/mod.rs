//! Asset cache controller and its registration
//!
//! - [`fetch`]: request/response model
//! - [`cache_storage`]: named, versioned cache generations
//! - [`network`]: network seam and the reqwest-backed implementation
//! - [`controller`]: install/activate/serve lifecycle and page messages
//! - [`registration`]: once-per-page registration and the update flow

pub mod cache_storage;
pub mod controller;
pub mod fetch;
pub mod network;
pub mod registration;

pub use cache_storage::{CacheStorage, NamedCache};
pub use controller::{
    AssetCacheController, CacheNames, MessageOutcome, WorkerMessage, WorkerState,
};
pub use fetch::{Request, RequestMode, Response, ResponseType};
pub use network::{HttpNetwork, Network, NetworkFetchError};
pub use registration::{RegistrationOutcome, UpdateEvent, WorkerRegistration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Install failed fetching {resource}: {reason}")]
    InstallFailed { resource: String, reason: String },

    #[error("Invalid worker state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("App shell resource {resource} is no longer cached")]
    ShellEvicted { resource: String },

    #[error("No active worker")]
    NoActiveWorker,
}
