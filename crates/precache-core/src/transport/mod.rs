//! Live network access for cache misses and install-time preloading.

pub mod http;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::{RequestKey, Response};

pub use http::HttpTransport;

/// Performs one live fetch per call. Any HTTP status counts as a response;
/// only failing to get a response at all is an error.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn fetch(&self, key: &RequestKey) -> Result<Response, TransportError>;
}
