//! precache - runs one deployment of the offline resource cache.
//!
//! Plays the hosting runtime for a `CacheWorker`: dispatches install, then
//! activate, then one fetch per request key given on the command line.
//!
//! ```text
//! precache [--config PATH] [KEY ...]
//! ```

mod config;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use precache_core::{CacheWorker, DiskBlobStore, HttpTransport, RequestKey, ResponseSource};
use reqwest::Url;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::DeploymentConfig;

/// Command line: an optional deployment file and the keys to resolve.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    keys: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
            parsed.config = Some(PathBuf::from(path));
        } else {
            parsed.keys.push(arg);
        }
    }
    Ok(parsed)
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;
    let deployment = DeploymentConfig::load(args.config.as_deref())?;

    let origin = Url::parse(&deployment.origin)
        .with_context(|| format!("Invalid origin: {}", deployment.origin))?;
    let transport = match deployment.timeout_secs {
        Some(secs) => HttpTransport::with_timeout(origin, Duration::from_secs(secs)),
        None => HttpTransport::new(origin),
    }
    .context("Failed to create HTTP transport")?;

    let store_dir = deployment.store_dir()?;
    let store = DiskBlobStore::new(store_dir.clone())
        .with_context(|| format!("Failed to open store: {}", store_dir.display()))?;

    let worker = CacheWorker::new(
        deployment.worker_config(),
        Arc::new(store),
        Arc::new(transport),
    );

    info!(generation = %worker.generation(), "Starting deployment");
    let stored = worker.on_install().await?;
    eprintln!("Installed {} ({} resources)", worker.generation(), stored);

    let report = worker.on_activate().await?;
    for failure in &report.failed {
        warn!(error = %failure, "Stale generation left for next activation");
    }
    eprintln!(
        "Activated {} (reaped {}, {} left over)",
        worker.generation(),
        report.deleted.len(),
        report.failed.len()
    );

    for raw in args.keys {
        let key = RequestKey::new(raw)?;
        match worker.on_fetch_traced(&key).await {
            Ok(resolved) => {
                let source = match resolved.source {
                    ResponseSource::Cache => "cache",
                    ResponseSource::Network => "network",
                };
                println!(
                    "{}\t{}\t{} bytes\t{} ({})",
                    key,
                    resolved.response.status,
                    resolved.response.body.len(),
                    source,
                    resolved.response.age_display()
                );
            }
            Err(e) => {
                eprintln!("{}\terror: {}", key, e);
            }
        }
    }

    Ok(())
}
