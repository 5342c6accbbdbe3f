use std::sync::Arc;

use tracing::{info, warn};

use super::registry::CacheGenerationRegistry;
use crate::error::{ReapError, StoreError};
use crate::models::Generation;
use crate::store::KeyedBlobStore;

/// Outcome of one reap pass.
#[derive(Debug, Default)]
pub struct ReapReport {
    pub deleted: Vec<Generation>,
    /// Left in place; the next activation tries them again.
    pub failed: Vec<ReapError>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes every materialized generation other than the active one.
pub struct StaleGenerationReaper<S> {
    store: Arc<S>,
}

impl<S: KeyedBlobStore> StaleGenerationReaper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Delete all stale generations concurrently. Individual failures are
    /// logged and reported, never returned as an error; only failing to list
    /// the store at all is.
    pub async fn reap(&self, active: &Generation) -> Result<ReapReport, StoreError> {
        let registry = CacheGenerationRegistry::new(active.clone(), Arc::clone(&self.store));
        let stale: Vec<Generation> = registry
            .list_materialized_generations()
            .await?
            .into_iter()
            .filter(|generation| registry.is_stale(generation))
            .collect();

        let deletions = stale.into_iter().map(|generation| {
            let store = Arc::clone(&self.store);
            async move {
                let outcome = store.delete(&generation).await;
                (generation, outcome)
            }
        });
        let results = futures::future::join_all(deletions).await;

        let mut report = ReapReport::default();
        for (generation, outcome) in results {
            match outcome {
                Ok(_) => {
                    info!(generation = %generation, "Deleted stale generation");
                    report.deleted.push(generation);
                }
                Err(source) => {
                    warn!(generation = %generation, error = %source, "Failed to delete stale generation");
                    report.failed.push(ReapError { generation, source });
                }
            }
        }
        Ok(report)
    }
}
