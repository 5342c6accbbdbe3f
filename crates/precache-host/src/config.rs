//! Deployment configuration for the host binary.
//!
//! A deployment names the generation, its manifest, and the origin resources
//! are fetched from. It is read from `~/.config/precache/deployment.json`
//! unless a path is given on the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use precache_core::{Generation, Manifest, WorkerConfig};
use serde::{Deserialize, Serialize};

/// Application name used for config/store directory paths
const APP_NAME: &str = "precache";

/// Config file name
const CONFIG_FILE: &str = "deployment.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub generation: Generation,
    pub manifest: Manifest,
    /// Base URL that relative request keys resolve against.
    pub origin: String,
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl DeploymentConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read deployment file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse deployment file: {}", path.display()))
    }

    fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::new(self.generation.clone(), self.manifest.clone())
    }
}
