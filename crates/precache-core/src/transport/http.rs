//! HTTP transport backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use tracing::debug;

use super::RequestTransport;
use crate::error::TransportError;
use crate::models::{RequestKey, Response};

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches request keys from one origin. Absolute-URL keys are fetched as-is;
/// relative keys are resolved against the origin.
///
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    origin: Url,
}

impl HttpTransport {
    pub fn new(origin: Url) -> Result<Self, TransportError> {
        Self::with_timeout(origin, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(origin: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve a request key to the URL it is fetched from.
    pub fn url_for(&self, key: &RequestKey) -> Result<Url, TransportError> {
        self.origin
            .join(key.as_str())
            .map_err(|e| TransportError::InvalidKey {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn fetch(&self, key: &RequestKey) -> Result<Response, TransportError> {
        let url = self.url_for(key)?;
        debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(Response {
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        })
    }
}
