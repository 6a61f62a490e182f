//! In-memory key→identifier cache.

use std::collections::HashMap;

use async_trait::async_trait;
use things_core::{Result, ThingCache};
use tokio::sync::RwLock;

/// Process-local [`ThingCache`] backed by a `HashMap`.
///
/// Saving overwrites any existing mapping for the key, and eviction
/// succeeds whether or not an entry is present. Concurrent readers share
/// the read lock; writers are serialized.
#[derive(Debug, Default)]
pub struct MemoryThingCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryThingCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cached mappings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the cache holds no mappings.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ThingCache for MemoryThingCache {
    async fn save(&self, key: &str, id: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), id.to_owned());
        Ok(())
    }

    async fn id(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
