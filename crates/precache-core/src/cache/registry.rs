use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::Generation;
use crate::store::KeyedBlobStore;

/// Which generation is active, and which ones exist in the store.
pub struct CacheGenerationRegistry<S> {
    active: Generation,
    store: Arc<S>,
}

impl<S: KeyedBlobStore> CacheGenerationRegistry<S> {
    pub fn new(active: Generation, store: Arc<S>) -> Self {
        Self { active, store }
    }

    pub fn active_generation(&self) -> &Generation {
        &self.active
    }

    pub async fn list_materialized_generations(&self) -> Result<BTreeSet<Generation>, StoreError> {
        Ok(self.store.list_generations().await?.into_iter().collect())
    }

    pub fn is_stale(&self, generation: &Generation) -> bool {
        generation != &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceEntry, Response};
    use crate::store::MemoryBlobStore;
    use crate::testing::{gen, key};

    #[test]
    fn test_is_stale() {
        let registry = CacheGenerationRegistry::new(gen("v2"), Arc::new(MemoryBlobStore::new()));
        assert!(!registry.is_stale(&gen("v2")));
        assert!(registry.is_stale(&gen("v1")));
        assert_eq!(registry.active_generation(), &gen("v2"));
    }

    #[tokio::test]
    async fn test_lists_what_the_store_holds() {
        let store = Arc::new(MemoryBlobStore::new());
        for id in ["v1", "v2"] {
            let handle = store.open(&gen(id)).await.unwrap();
            store
                .put_all(&handle, vec![ResourceEntry::new(key("/a"), Response::new(200, id))])
                .await
                .unwrap();
        }

        let registry = CacheGenerationRegistry::new(gen("v2"), store);
        let listed = registry.list_materialized_generations().await.unwrap();
        assert_eq!(listed, BTreeSet::from([gen("v1"), gen("v2")]));
    }
}
