use std::io;
use thiserror::Error;

use crate::orchestrator::OfflineError;
use crate::questions::SourceError;
use crate::store::StorageError;
use crate::worker::{NetworkFetchError, WorkerError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Question source error: {0}")]
    Source(#[from] SourceError),

    #[error("Offline cache error: {0}")]
    Offline(#[from] OfflineError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkFetchError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
