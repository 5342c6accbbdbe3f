use thiserror::Error;

use crate::models::{Generation, RequestKey};

/// Failures raised by a [`KeyedBlobStore`](crate::store::KeyedBlobStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode entry metadata: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt store entry: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures raised by a [`RequestTransport`](crate::transport::RequestTransport).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Unreachable: {0}")]
    Unreachable(String),
}

/// Install-time failure. Nothing is committed for the generation when this is returned.
#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("Fetching {key} failed: {source}")]
    Fetch {
        key: RequestKey,
        #[source]
        source: TransportError,
    },

    #[error("Fetching {key} returned status {status}")]
    Status { key: RequestKey, status: u16 },

    #[error("Install of {generation} was superseded by {by}")]
    Superseded { generation: Generation, by: Generation },

    #[error("Committing {generation} failed: {source}")]
    Commit {
        generation: Generation,
        #[source]
        source: StoreError,
    },
}

/// Deleting one stale generation failed. Never fatal to activation.
#[derive(Error, Debug)]
#[error("Failed to delete generation {generation}: {source}")]
pub struct ReapError {
    pub generation: Generation,
    #[source]
    pub source: StoreError,
}

/// The live fetch behind a cache miss failed. Displays exactly as the transport error.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct MissFetchError(#[from] pub TransportError);

impl MissFetchError {
    pub fn into_inner(self) -> TransportError {
        self.0
    }
}

/// Errors returned by the [`CacheWorker`](crate::worker::CacheWorker) lifecycle hooks.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Install failed: {0}")]
    Population(#[from] PopulationError),

    #[error("Cannot activate {generation} before it is installed")]
    NotInstalled { generation: Generation },

    #[error(transparent)]
    MissFetch(#[from] MissFetchError),
}

pub type Result<T, E = WorkerError> = std::result::Result<T, E>;
