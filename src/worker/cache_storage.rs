//! Named cache generations
//!
//! A process-wide map of cache name to request-keyed responses, shared by every
//! controller version the way browser cache storage is shared per origin.

use dashmap::DashMap;
use std::sync::Arc;

use super::fetch::Response;

/// One named cache: request key to stored response
#[derive(Debug, Default)]
pub struct NamedCache {
    entries: DashMap<String, Response>,
}

impl NamedCache {
    pub fn get(&self, key: &str) -> Option<Response> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn put(&self, key: impl Into<String>, response: Response) {
        self.entries.insert(key.into(), response);
    }

    /// Insert a batch that has already been fetched in full
    pub fn put_all(&self, entries: Vec<(String, Response)>) {
        for (key, response) in entries {
            self.entries.insert(key, response);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: DashMap<String, Arc<NamedCache>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache by name, creating it if missing
    pub fn open(&self, name: &str) -> Arc<NamedCache> {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(NamedCache::default()))
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<NamedCache>> {
        self.caches.get(name).map(|entry| entry.value().clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    pub fn delete(&self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// First match for `key` across the given caches, in order
    pub fn match_in(&self, cache_names: &[&str], key: &str) -> Option<Response> {
        cache_names
            .iter()
            .filter_map(|name| self.get(name))
            .find_map(|cache| cache.get(key))
    }
}
