use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Database file, defaults to ~/.trivia-offline/offline.db
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_remote_table")]
    pub table: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    #[serde(default = "default_worker_version")]
    pub version: String,
    #[serde(default = "default_shell_cache_prefix")]
    pub shell_cache_prefix: String,
    #[serde(default = "default_offline_cache_prefix")]
    pub offline_cache_prefix: String,
    /// Origin the app shell is served from
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_essential_resources")]
    pub essential_resources: Vec<String>,
    #[serde(default = "default_fallback_page")]
    pub fallback_page: String,
    #[serde(default = "default_offline_questions_key")]
    pub offline_questions_key: String,
}

// Default value functions
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_auto_sync() -> bool {
    true
}

fn default_remote_table() -> String {
    "questions".to_string()
}

fn default_remote_timeout() -> u64 {
    30000
}

fn default_worker_version() -> String {
    "v1".to_string()
}

fn default_shell_cache_prefix() -> String {
    "trivia-shell".to_string()
}

fn default_offline_cache_prefix() -> String {
    "trivia-offline".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_essential_resources() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
    ]
}

fn default_fallback_page() -> String {
    "/index.html".to_string()
}

fn default_offline_questions_key() -> String {
    "/offline-questions.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            history_limit: default_history_limit(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            auto_sync: default_auto_sync(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_remote_table(),
            timeout_ms: default_remote_timeout(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: default_worker_version(),
            shell_cache_prefix: default_shell_cache_prefix(),
            offline_cache_prefix: default_offline_cache_prefix(),
            origin: default_origin(),
            essential_resources: default_essential_resources(),
            fallback_page: default_fallback_page(),
            offline_questions_key: default_offline_questions_key(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(path.clone()),
            None => dirs::home_dir().map(|home| home.join(".trivia-offline").join("offline.db")),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl WorkerConfig {
    pub fn shell_cache_name(&self) -> String {
        format!("{}-{}", self.shell_cache_prefix, self.version)
    }

    pub fn offline_cache_name(&self) -> String {
        format!("{}-{}", self.offline_cache_prefix, self.version)
    }

    /// Same worker settings under another version tag
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}
