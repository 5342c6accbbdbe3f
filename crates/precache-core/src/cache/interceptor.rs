use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::MissFetchError;
use crate::models::{Generation, RequestKey, Response};
use crate::store::KeyedBlobStore;
use crate::transport::RequestTransport;

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub response: Response,
    pub source: ResponseSource,
}

/// Cache-first resolution against one generation, falling back to the network.
///
/// Network responses are handed back as-is and never stored: the generation
/// holds exactly what install put there.
pub struct RequestInterceptor<S, T> {
    generation: Generation,
    store: Arc<S>,
    transport: Arc<T>,
}

impl<S: KeyedBlobStore, T: RequestTransport> RequestInterceptor<S, T> {
    pub fn new(generation: Generation, store: Arc<S>, transport: Arc<T>) -> Self {
        Self {
            generation,
            store,
            transport,
        }
    }

    pub async fn resolve(&self, key: &RequestKey) -> Result<Response, MissFetchError> {
        self.resolve_traced(key).await.map(|resolved| resolved.response)
    }

    /// [`resolve`](Self::resolve), also reporting whether the cache answered.
    pub async fn resolve_traced(&self, key: &RequestKey) -> Result<Resolved, MissFetchError> {
        if let Some(response) = self.lookup(key).await {
            debug!(generation = %self.generation, key = %key, "Cache hit");
            return Ok(Resolved {
                response,
                source: ResponseSource::Cache,
            });
        }

        debug!(generation = %self.generation, key = %key, "Cache miss, fetching");
        let response = self.transport.fetch(key).await?;
        Ok(Resolved {
            response,
            source: ResponseSource::Network,
        })
    }

    /// Store errors count as a miss so the request still reaches the network.
    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        let handle = match self.store.open(&self.generation).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(generation = %self.generation, error = %e, "Failed to open generation");
                return None;
            }
        };
        match self.store.lookup(&handle, key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(generation = %self.generation, key = %key, error = %e, "Cache lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::models::ResourceEntry;
    use crate::store::MemoryBlobStore;
    use crate::testing::{gen, key, FaultyStore, ScriptedTransport};
    use bytes::Bytes;

    async fn seeded(store: &impl KeyedBlobStore, id: &str, entries: &[(&str, &'static str)]) {
        let handle = store.open(&gen(id)).await.unwrap();
        let entries = entries
            .iter()
            .map(|(k, body)| ResourceEntry::new(key(k), Response::new(200, *body)))
            .collect();
        store.put_all(&handle, entries).await.unwrap();
    }

    #[tokio::test]
    async fn test_hit_makes_no_network_call() {
        let store = Arc::new(MemoryBlobStore::new());
        seeded(store.as_ref(), "v1", &[("/a", "cached")]).await;
        let transport = Arc::new(ScriptedTransport::new());
        let interceptor = RequestInterceptor::new(gen("v1"), store, Arc::clone(&transport));

        let resolved = interceptor.resolve_traced(&key("/a")).await.unwrap();

        assert_eq!(resolved.source, ResponseSource::Cache);
        assert_eq!(resolved.response.body, Bytes::from("cached"));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_is_fetched_every_time_and_never_stored() {
        let store = Arc::new(MemoryBlobStore::new());
        seeded(store.as_ref(), "v1", &[("/a", "cached")]).await;
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/x", 200, "live");
        let interceptor =
            RequestInterceptor::new(gen("v1"), Arc::clone(&store), Arc::clone(&transport));

        let first = interceptor.resolve(&key("/x")).await.unwrap();
        let second = interceptor.resolve(&key("/x")).await.unwrap();

        assert_eq!(first.body, Bytes::from("live"));
        assert_eq!(second.body, Bytes::from("live"));
        assert_eq!(transport.calls("/x"), 2);
        assert_eq!(store.keys(&gen("v1")).await, Some(vec![key("/a")]));
    }

    #[tokio::test]
    async fn test_only_active_generation_is_consulted() {
        let store = Arc::new(MemoryBlobStore::new());
        seeded(store.as_ref(), "v1", &[("/old", "from v1")]).await;
        seeded(store.as_ref(), "v2", &[("/a", "from v2")]).await;
        let transport = Arc::new(ScriptedTransport::new());
        let interceptor = RequestInterceptor::new(gen("v2"), store, Arc::clone(&transport));

        let resolved = interceptor.resolve_traced(&key("/old")).await.unwrap();
        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(transport.calls("/old"), 1);
    }

    #[tokio::test]
    async fn test_miss_returns_error_status_verbatim() {
        let store = Arc::new(MemoryBlobStore::new());
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/gone", 410, "gone");
        let interceptor = RequestInterceptor::new(gen("v1"), store, transport);

        let response = interceptor.resolve(&key("/gone")).await.unwrap();
        assert_eq!(response.status, 410);
        assert_eq!(response.body, Bytes::from("gone"));
    }

    #[tokio::test]
    async fn test_failed_miss_fetch_propagates_unchanged() {
        let store = Arc::new(MemoryBlobStore::new());
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("/x");
        let interceptor = RequestInterceptor::new(gen("v1"), store, Arc::clone(&transport));

        let err = interceptor.resolve(&key("/x")).await.unwrap_err();
        assert_eq!(err.to_string(), "Unreachable: /x is offline");
        assert!(matches!(err.into_inner(), TransportError::Unreachable(_)));
        assert_eq!(transport.calls("/x"), 1);
    }

    #[tokio::test]
    async fn test_store_error_falls_back_to_network() {
        let store = Arc::new(FaultyStore::new());
        seeded(store.as_ref(), "v1", &[("/a", "cached")]).await;
        store.fail_lookups(true);
        let transport = Arc::new(ScriptedTransport::new());
        let interceptor = RequestInterceptor::new(gen("v1"), store, Arc::clone(&transport));

        let resolved = interceptor.resolve_traced(&key("/a")).await.unwrap();
        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(transport.calls("/a"), 1);
    }
}
