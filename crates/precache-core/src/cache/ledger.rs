use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::Generation;

#[derive(Debug, Default)]
struct LedgerState {
    latest: Option<Generation>,
    begun: HashSet<Generation>,
}

/// Records the most recent install across successive workers.
///
/// A worker's install holds an [`InstallTicket`]; when the first install of a
/// different generation begins on the same ledger, every older ticket becomes
/// superseded. Repeat installs of a generation that already began never take
/// the lead back. Clones share the same ledger.
#[derive(Clone)]
pub struct InstallLedger {
    state: Arc<watch::Sender<LedgerState>>,
}

impl InstallLedger {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LedgerState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Mark `generation` as the newest install, unless it has begun before.
    pub fn begin(&self, generation: &Generation) -> InstallTicket {
        self.state.send_if_modified(|state| {
            if state.begun.insert(generation.clone()) {
                state.latest = Some(generation.clone());
                true
            } else {
                false
            }
        });
        InstallTicket {
            generation: generation.clone(),
            state: self.state.subscribe(),
        }
    }

    pub fn latest(&self) -> Option<Generation> {
        self.state.borrow().latest.clone()
    }
}

impl Default for InstallLedger {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InstallTicket {
    generation: Generation,
    state: watch::Receiver<LedgerState>,
}

impl InstallTicket {
    /// A ticket no other install can supersede.
    pub fn unsupervised(generation: &Generation) -> Self {
        let (_, state) = watch::channel(LedgerState {
            latest: Some(generation.clone()),
            begun: HashSet::from([generation.clone()]),
        });
        Self {
            generation: generation.clone(),
            state,
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// The newer generation that took over, if any.
    pub fn superseded_by(&self) -> Option<Generation> {
        Self::newer(&self.generation, &self.state)
    }

    /// Resolves once a newer install begins; pends forever otherwise.
    pub async fn superseded(&self) -> Generation {
        let mut state = self.state.clone();
        loop {
            if let Some(by) = Self::newer(&self.generation, &state) {
                return by;
            }
            if state.changed().await.is_err() {
                // Ledger gone, nothing can supersede us any more
                std::future::pending::<()>().await;
            }
        }
    }

    fn newer(generation: &Generation, state: &watch::Receiver<LedgerState>) -> Option<Generation> {
        match &state.borrow().latest {
            Some(current) if current != generation => Some(current.clone()),
            _ => None,
        }
    }
}
