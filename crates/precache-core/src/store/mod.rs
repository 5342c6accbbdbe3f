//! Generation-scoped response storage.
//!
//! A store holds one keyed set of responses per [`Generation`]. Two
//! implementations ship with the crate:
//! - `MemoryBlobStore`: process-local, for tests and embedding
//! - `DiskBlobStore`: one directory per generation, committed by rename
//!
//! Opening a handle never materializes a generation. A generation only
//! exists once a `put_all` into it has committed.

pub mod disk;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Generation, RequestKey, ResourceEntry, Response};

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;

/// Handle to one generation's entries, returned by [`KeyedBlobStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    generation: Generation,
}

impl StoreHandle {
    pub fn new(generation: Generation) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }
}

/// Persistent key->response storage partitioned by generation.
#[async_trait]
pub trait KeyedBlobStore: Send + Sync {
    /// Get a handle for `generation`. Does not create anything.
    async fn open(&self, generation: &Generation) -> Result<StoreHandle, StoreError> {
        Ok(StoreHandle::new(generation.clone()))
    }

    /// Look up `key` in the handle's generation. Absent generation means `None`.
    async fn lookup(
        &self,
        handle: &StoreHandle,
        key: &RequestKey,
    ) -> Result<Option<Response>, StoreError>;

    /// Write every entry as one unit: either all become visible or none do.
    /// Entries already in the generation under other keys are kept.
    async fn put_all(
        &self,
        handle: &StoreHandle,
        entries: Vec<ResourceEntry>,
    ) -> Result<(), StoreError>;

    /// All generations currently materialized.
    async fn list_generations(&self) -> Result<Vec<Generation>, StoreError>;

    /// Remove a whole generation. Returns `false` if it did not exist.
    async fn delete(&self, generation: &Generation) -> Result<bool, StoreError>;
}
