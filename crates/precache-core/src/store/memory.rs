use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyedBlobStore, StoreHandle};
use crate::error::StoreError;
use crate::models::{Generation, RequestKey, ResourceEntry, Response};

type Entries = HashMap<RequestKey, Response>;

/// In-process store. Each `put_all` runs under a single write lock, so readers
/// see a generation either before or after the whole batch.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    generations: RwLock<HashMap<Generation, Entries>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys stored under `generation`, sorted. `None` if it is not materialized.
    pub async fn keys(&self, generation: &Generation) -> Option<Vec<RequestKey>> {
        let guard = self.generations.read().await;
        guard.get(generation).map(|entries| {
            let mut keys: Vec<RequestKey> = entries.keys().cloned().collect();
            keys.sort();
            keys
        })
    }
}

#[async_trait]
impl KeyedBlobStore for MemoryBlobStore {
    async fn lookup(
        &self,
        handle: &StoreHandle,
        key: &RequestKey,
    ) -> Result<Option<Response>, StoreError> {
        let guard = self.generations.read().await;
        Ok(guard
            .get(handle.generation())
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put_all(
        &self,
        handle: &StoreHandle,
        entries: Vec<ResourceEntry>,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut guard = self.generations.write().await;
        let generation = guard.entry(handle.generation().clone()).or_default();
        for entry in entries {
            generation.insert(entry.key, entry.response);
        }
        Ok(())
    }

    async fn list_generations(&self) -> Result<Vec<Generation>, StoreError> {
        let guard = self.generations.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn delete(&self, generation: &Generation) -> Result<bool, StoreError> {
        let mut guard = self.generations.write().await;
        Ok(guard.remove(generation).is_some())
    }
}
