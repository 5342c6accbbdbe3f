//! The worker coordinator: one type, three lifecycle hooks.
//!
//! The hosting runtime drives a [`CacheWorker`] through `on_install`,
//! `on_activate` and `on_fetch`, awaiting each returned future to completion.
//!
//! ```text
//! Uninstalled -> Installing -> Installed -> Activating -> Active
//!                    |
//!                    +-> Redundant (install failed or superseded)
//! ```
//!
//! Both install and activate tolerate being dispatched more than once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{
    CacheGenerationRegistry, InstallLedger, InstallTicket, ReapReport, RequestInterceptor,
    Resolved, ResourceCachePopulator, ResponseSource, StaleGenerationReaper,
};
use crate::config::WorkerConfig;
use crate::error::{MissFetchError, Result, WorkerError};
use crate::models::{Generation, Manifest, RequestKey, Response};
use crate::store::KeyedBlobStore;
use crate::transport::RequestTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

impl WorkerState {
    /// Whether fetches are answered from the generation's store.
    pub fn is_serving(self) -> bool {
        matches!(self, WorkerState::Activating | WorkerState::Active)
    }
}

pub struct CacheWorker<S, T> {
    config: WorkerConfig,
    state: RwLock<WorkerState>,
    /// Set once an install of this generation has committed.
    committed: AtomicBool,
    ledger: InstallLedger,
    transport: Arc<T>,
    registry: CacheGenerationRegistry<S>,
    populator: ResourceCachePopulator<S, T>,
    reaper: StaleGenerationReaper<S>,
    interceptor: RequestInterceptor<S, T>,
}

impl<S: KeyedBlobStore, T: RequestTransport> CacheWorker<S, T> {
    pub fn new(config: WorkerConfig, store: Arc<S>, transport: Arc<T>) -> Self {
        Self::with_ledger(config, store, transport, InstallLedger::new())
    }

    /// Build a worker sharing `ledger` with other workers, so that a newer
    /// worker's install supersedes this one's.
    pub fn with_ledger(
        config: WorkerConfig,
        store: Arc<S>,
        transport: Arc<T>,
        ledger: InstallLedger,
    ) -> Self {
        let generation = config.generation.clone();
        Self {
            registry: CacheGenerationRegistry::new(generation.clone(), Arc::clone(&store)),
            populator: ResourceCachePopulator::new(Arc::clone(&store), Arc::clone(&transport)),
            reaper: StaleGenerationReaper::new(Arc::clone(&store)),
            interceptor: RequestInterceptor::new(generation, store, Arc::clone(&transport)),
            transport,
            ledger,
            config,
            state: RwLock::new(WorkerState::Uninstalled),
            committed: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.config.generation
    }

    pub fn manifest(&self) -> &Manifest {
        &self.config.manifest
    }

    pub fn registry(&self) -> &CacheGenerationRegistry<S> {
        &self.registry
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Populate this worker's generation. Returns the number of entries stored.
    ///
    /// A repeat install after success re-populates in place without taking
    /// the lead from a newer install, and never downgrades the worker: once
    /// the generation has committed, a failed repeat leaves it installed.
    pub async fn on_install(&self) -> Result<usize> {
        let generation = self.generation();
        let committed = {
            let mut state = self.state.write().await;
            let committed = self.committed.load(Ordering::SeqCst);
            if !committed && !state.is_serving() {
                *state = WorkerState::Installing;
            }
            committed
        };
        info!(
            generation = %generation,
            count = self.manifest().len(),
            repeat = committed,
            "Installing"
        );

        let ticket = if committed {
            InstallTicket::unsupervised(generation)
        } else {
            self.ledger.begin(generation)
        };
        let outcome = self
            .populator
            .populate_until_superseded(generation, self.manifest(), &ticket)
            .await;

        let mut state = self.state.write().await;
        match outcome {
            Ok(count) => {
                self.committed.store(true, Ordering::SeqCst);
                if !state.is_serving() {
                    *state = WorkerState::Installed;
                }
                Ok(count)
            }
            Err(e) => {
                error!(generation = %generation, error = %e, "Install failed");
                if !self.committed.load(Ordering::SeqCst) && !state.is_serving() {
                    *state = WorkerState::Redundant;
                }
                Err(e.into())
            }
        }
    }

    /// Start serving this generation and reap every other one.
    ///
    /// Reap problems never fail activation: generations that could not be
    /// deleted are reported and retried on the next activation.
    pub async fn on_activate(&self) -> Result<ReapReport> {
        let generation = self.generation();
        {
            let mut state = self.state.write().await;
            match *state {
                WorkerState::Installed => *state = WorkerState::Activating,
                WorkerState::Activating | WorkerState::Active => {
                    debug!(generation = %generation, "Repeat activation");
                }
                _ => {
                    return Err(WorkerError::NotInstalled {
                        generation: generation.clone(),
                    })
                }
            }
        }
        info!(generation = %generation, "Activating");

        let report = match self.reaper.reap(generation).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Failed to list generations, skipping reap");
                ReapReport::default()
            }
        };

        *self.state.write().await = WorkerState::Active;
        info!(
            generation = %generation,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Active"
        );
        Ok(report)
    }

    pub async fn on_fetch(&self, key: &RequestKey) -> Result<Response> {
        self.on_fetch_traced(key).await.map(|resolved| resolved.response)
    }

    /// [`on_fetch`](Self::on_fetch), also reporting whether the cache answered.
    /// Before activation every request goes straight to the network.
    pub async fn on_fetch_traced(&self, key: &RequestKey) -> Result<Resolved> {
        if self.state().await.is_serving() {
            return Ok(self.interceptor.resolve_traced(key).await?);
        }

        debug!(key = %key, "Not serving yet, passing through");
        let response = self
            .transport
            .fetch(key)
            .await
            .map_err(MissFetchError::from)?;
        Ok(Resolved {
            response,
            source: ResponseSource::Network,
        })
    }
}
