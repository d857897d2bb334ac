//! Process-local cache storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::entries::CachedResponse;

/// In-memory namespaces of cached responses.
///
/// Uses a map of maps behind a tokio RwLock; clones share the same storage.
/// Single-entry writes are atomic, batch writes hold the lock for the whole batch.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    pub(crate) namespaces: Arc<RwLock<BTreeMap<String, HashMap<String, CachedResponse>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored in a namespace (0 if absent).
    pub async fn entry_count(&self, namespace: &str) -> usize {
        self.namespaces.read().await.get(namespace).map_or(0, HashMap::len)
    }
}
