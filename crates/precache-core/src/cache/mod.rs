//! Generation lifecycle: populate at install, reap at activate, intercept on fetch.
//!
//! - `CacheGenerationRegistry`: the active generation and what the store holds
//! - `ResourceCachePopulator`: all-or-nothing preload of a manifest
//! - `StaleGenerationReaper`: removes every generation but the active one
//! - `RequestInterceptor`: cache-first resolution with network fallback
//! - `InstallLedger`: lets a newer install supersede an in-flight one

pub mod interceptor;
pub mod ledger;
pub mod populator;
pub mod reaper;
pub mod registry;

pub use interceptor::{RequestInterceptor, Resolved, ResponseSource};
pub use ledger::{InstallLedger, InstallTicket};
pub use populator::ResourceCachePopulator;
pub use reaper::{ReapReport, StaleGenerationReaper};
pub use registry::CacheGenerationRegistry;
