//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{StoreError, TransportError};
use crate::models::{Generation, RequestKey, ResourceEntry, Response};
use crate::store::{KeyedBlobStore, MemoryBlobStore, StoreHandle};
use crate::transport::RequestTransport;

pub fn gen(id: &str) -> Generation {
    Generation::new(id).unwrap()
}

pub fn key(k: &str) -> RequestKey {
    RequestKey::new(k).unwrap()
}

#[derive(Clone)]
enum Reply {
    Respond(u16, String),
    Fail,
}

/// Transport answering from a script and counting calls per key.
/// Unscripted keys answer 200 with body `<key>`.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<RequestKey, Reply>>,
    calls: Mutex<HashMap<RequestKey, usize>>,
    held: Mutex<HashMap<RequestKey, Arc<Notify>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, k: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(key(k), Reply::Respond(status, body.to_string()));
    }

    pub fn fail(&self, k: &str) {
        self.replies.lock().unwrap().insert(key(k), Reply::Fail);
    }

    /// Make fetches of `k` wait until the returned handle is notified.
    pub fn hold(&self, k: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.held.lock().unwrap().insert(key(k), Arc::clone(&notify));
        notify
    }

    pub fn calls(&self, k: &str) -> usize {
        self.calls.lock().unwrap().get(&key(k)).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RequestTransport for ScriptedTransport {
    async fn fetch(&self, k: &RequestKey) -> Result<Response, TransportError> {
        *self.calls.lock().unwrap().entry(k.clone()).or_default() += 1;

        let gate = self.held.lock().unwrap().get(k).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().unwrap().get(k).cloned();
        match reply {
            Some(Reply::Respond(status, body)) => Ok(Response::new(status, body)),
            Some(Reply::Fail) => Err(TransportError::Unreachable(format!("{} is offline", k))),
            None => Ok(Response::new(200, k.to_string())),
        }
    }
}

/// Memory store that can be told to fail deletes or commits.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryBlobStore,
    failing_deletes: Mutex<HashSet<Generation>>,
    failing_commits: AtomicBool,
    failing_lookups: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete(&self, generation: &Generation, failing: bool) {
        let mut set = self.failing_deletes.lock().unwrap();
        if failing {
            set.insert(generation.clone());
        } else {
            set.remove(generation);
        }
    }

    pub fn fail_commits(&self, failing: bool) {
        self.failing_commits.store(failing, Ordering::SeqCst);
    }

    pub fn fail_lookups(&self, failing: bool) {
        self.failing_lookups.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyedBlobStore for FaultyStore {
    async fn lookup(
        &self,
        handle: &StoreHandle,
        k: &RequestKey,
    ) -> Result<Option<Response>, StoreError> {
        if self.failing_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("lookup disabled".to_string()));
        }
        self.inner.lookup(handle, k).await
    }

    async fn put_all(
        &self,
        handle: &StoreHandle,
        entries: Vec<ResourceEntry>,
    ) -> Result<(), StoreError> {
        if self.failing_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.put_all(handle, entries).await
    }

    async fn list_generations(&self) -> Result<Vec<Generation>, StoreError> {
        self.inner.list_generations().await
    }

    async fn delete(&self, generation: &Generation) -> Result<bool, StoreError> {
        if self.failing_deletes.lock().unwrap().contains(generation) {
            return Err(StoreError::Unavailable(format!("{} is locked", generation)));
        }
        self.inner.delete(generation).await
    }
}
