use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use serde_json::Value;

/// Store for fetch payloads, keyed by [`DataSource::cache_key`](super::DataSource::cache_key).
pub trait FetchCache: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: String, value: Value);
}

/// In-process fetch cache. Entries live as long as the cache; nothing is evicted.
#[derive(Debug, Default)]
pub struct MemoryFetchCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryFetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl FetchCache for MemoryFetchCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn put(&self, key: String, value: Value) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key, value);
    }
}
