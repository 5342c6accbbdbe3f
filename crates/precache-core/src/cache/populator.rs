use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::ledger::InstallTicket;
use crate::error::PopulationError;
use crate::models::{Generation, Manifest, ResourceEntry};
use crate::store::KeyedBlobStore;
use crate::transport::RequestTransport;

/// Maximum manifest fetches in flight at once during install.
const MAX_CONCURRENT_FETCHES: usize = 6;

/// Preloads a generation from its manifest.
///
/// Every response is buffered in memory and the store is written once, after
/// the last fetch succeeds. A failed, non-2xx or superseded install therefore
/// leaves nothing behind.
pub struct ResourceCachePopulator<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
}

impl<S: KeyedBlobStore, T: RequestTransport> ResourceCachePopulator<S, T> {
    pub fn new(store: Arc<S>, transport: Arc<T>) -> Self {
        Self { store, transport }
    }

    /// Fetch and commit every manifest entry. Returns the number of entries stored.
    pub async fn populate(
        &self,
        generation: &Generation,
        manifest: &Manifest,
    ) -> Result<usize, PopulationError> {
        self.populate_until_superseded(generation, manifest, &InstallTicket::unsupervised(generation))
            .await
    }

    /// Like [`populate`](Self::populate), but abandons the install without
    /// committing once `ticket` is superseded by a newer generation.
    pub async fn populate_until_superseded(
        &self,
        generation: &Generation,
        manifest: &Manifest,
        ticket: &InstallTicket,
    ) -> Result<usize, PopulationError> {
        debug!(generation = %generation, count = manifest.len(), "Fetching manifest");

        let entries = tokio::select! {
            biased;
            by = ticket.superseded() => {
                return Err(PopulationError::Superseded { generation: generation.clone(), by });
            }
            fetched = self.fetch_all(manifest) => fetched?,
        };

        // A newer install may have started while the last fetch resolved
        if let Some(by) = ticket.superseded_by() {
            return Err(PopulationError::Superseded {
                generation: generation.clone(),
                by,
            });
        }

        let count = entries.len();
        if count == 0 {
            return Ok(0);
        }

        let commit = |source| PopulationError::Commit {
            generation: generation.clone(),
            source,
        };
        let handle = self.store.open(generation).await.map_err(commit)?;
        self.store.put_all(&handle, entries).await.map_err(commit)?;

        info!(generation = %generation, count, "Generation populated");
        Ok(count)
    }

    /// Fetch every key, in manifest order, stopping at the first failure.
    async fn fetch_all(&self, manifest: &Manifest) -> Result<Vec<ResourceEntry>, PopulationError> {
        stream::iter(manifest.keys().iter().cloned())
            .map(|key| {
                let transport = Arc::clone(&self.transport);
                async move {
                    match transport.fetch(&key).await {
                        Ok(response) if response.is_success() => Ok(ResourceEntry::new(key, response)),
                        Ok(response) => Err(PopulationError::Status {
                            status: response.status,
                            key,
                        }),
                        Err(source) => Err(PopulationError::Fetch { key, source }),
                    }
                }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .try_collect()
            .await
    }
}
