//! precache-core - offline resource cache organised in generations.
//!
//! Each deployment installs a new generation by preloading a manifest into a
//! [`KeyedBlobStore`], activates it by reaping every older generation, and then
//! answers requests cache-first with network fallback.
//!
//! - `models`: generations, manifests, responses
//! - `store`: generation-scoped storage (memory and disk)
//! - `transport`: live network fetches (HTTP)
//! - `cache`: registry, populator, reaper, interceptor
//! - `worker`: the `CacheWorker` coordinator with its three lifecycle hooks

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod transport;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{ReapReport, Resolved, ResponseSource};
pub use config::WorkerConfig;
pub use error::{
    MissFetchError, PopulationError, ReapError, StoreError, TransportError, WorkerError,
};
pub use models::{Generation, Manifest, ModelError, RequestKey, ResourceEntry, Response};
pub use store::{DiskBlobStore, KeyedBlobStore, MemoryBlobStore, StoreHandle};
pub use transport::{HttpTransport, RequestTransport};
pub use worker::{CacheWorker, WorkerState};
