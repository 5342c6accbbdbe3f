//! Data models for cache generations.
//!
//! - `Generation`: opaque id of one deployment's cache contents
//! - `Manifest`, `RequestKey`: the resources preloaded at install
//! - `Response`, `ResourceEntry`: what a generation stores per key

pub mod generation;
pub mod manifest;
pub mod response;

use thiserror::Error;

pub use generation::Generation;
pub use manifest::{Manifest, RequestKey};
pub use response::{ResourceEntry, Response};
pub(crate) use response::ResponseMeta;

/// Rejections raised while building model values from configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Generation id must not be empty")]
    EmptyGeneration,

    #[error("Request key must not be empty")]
    EmptyKey,

    #[error("Manifest lists {0} more than once")]
    DuplicateKey(String),
}
