//! Deploy-time worker configuration.
//!
//! A worker is built for exactly one generation and its manifest; both are
//! fixed for the worker's lifetime. A new deployment means a new worker.

use serde::{Deserialize, Serialize};

use crate::models::{Generation, Manifest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub generation: Generation,
    pub manifest: Manifest,
}

impl WorkerConfig {
    pub fn new(generation: Generation, manifest: Manifest) -> Self {
        Self {
            generation,
            manifest,
        }
    }
}
