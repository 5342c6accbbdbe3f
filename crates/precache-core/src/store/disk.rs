use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{KeyedBlobStore, StoreHandle};
use crate::error::StoreError;
use crate::models::{Generation, RequestKey, ResourceEntry, Response, ResponseMeta};

/// Prefix of directories that are never listed as generations.
const HIDDEN_PREFIX: char = '.';

/// Marker inside each generation directory holding the real generation id.
const GENERATION_FILE: &str = "generation.json";

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct GenerationFile {
    generation: Generation,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryFile {
    key: String,
    #[serde(flatten)]
    meta: ResponseMeta,
}

/// Directory-backed store.
///
/// Layout under the root directory:
///
/// ```text
/// <sha256(generation)>/generation.json      the generation id
/// <sha256(generation)>/<sha256(key)>.json   status, headers, fetched_at, key
/// <sha256(generation)>/<sha256(key)>.body   raw body bytes
/// .staging-*/                                generation being committed
/// .retired-*/                                generation being replaced or removed
/// ```
///
/// A commit builds the complete generation in a staging directory and
/// renames it into place, so a crash mid-write leaves only a hidden directory
/// that the next [`DiskBlobStore::new`] sweeps away.
pub struct DiskBlobStore {
    root: PathBuf,
    commit_lock: Mutex<()>,
    #[cfg(test)]
    fail_swap: std::sync::atomic::AtomicBool,
}

impl DiskBlobStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&root)?;
        let store = Self {
            root,
            commit_lock: Mutex::new(()),
            #[cfg(test)]
            fail_swap: Default::default(),
        };
        store.sweep_hidden()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fixed-length directory name, whatever the length of the id.
    fn generation_stem(generation: &Generation) -> String {
        hex::encode(Sha256::digest(generation.as_str().as_bytes()))
    }

    fn generation_dir(&self, generation: &Generation) -> PathBuf {
        self.root.join(Self::generation_stem(generation))
    }

    fn hidden_dir(&self, purpose: &str, generation: &Generation) -> PathBuf {
        let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{}{}-{}-{}-{}",
            HIDDEN_PREFIX,
            purpose,
            Self::generation_stem(generation),
            std::process::id(),
            seq
        ))
    }

    fn entry_stem(key: &RequestKey) -> String {
        hex::encode(Sha256::digest(key.as_str().as_bytes()))
    }

    /// Remove staging/retired leftovers from an interrupted process.
    fn sweep_hidden(&self) -> Result<(), StoreError> {
        for dirent in std::fs::read_dir(&self.root)? {
            let dirent = dirent?;
            let name = dirent.file_name();
            if name.to_string_lossy().starts_with(HIDDEN_PREFIX) && dirent.path().is_dir() {
                debug!(dir = %dirent.path().display(), "Removing leftover store directory");
                std::fs::remove_dir_all(dirent.path())?;
            }
        }
        Ok(())
    }

    async fn write_entry(dir: &Path, entry: &ResourceEntry) -> Result<(), StoreError> {
        let stem = Self::entry_stem(&entry.key);
        let file = EntryFile {
            key: entry.key.as_str().to_string(),
            meta: entry.response.meta(),
        };
        fs::write(dir.join(format!("{}.{}", stem, BODY_EXT)), &entry.response.body).await?;
        fs::write(
            dir.join(format!("{}.{}", stem, META_EXT)),
            serde_json::to_vec_pretty(&file)?,
        )
        .await?;
        Ok(())
    }

    async fn read_generation_file(dir: &Path) -> Option<Generation> {
        let raw = fs::read(dir.join(GENERATION_FILE)).await.ok()?;
        let file: GenerationFile = serde_json::from_slice(&raw).ok()?;
        Some(file.generation)
    }

    async fn copy_dir_files(from: &Path, to: &Path) -> Result<(), StoreError> {
        let mut dir = fs::read_dir(from).await?;
        while let Some(dirent) = dir.next_entry().await? {
            fs::copy(dirent.path(), to.join(dirent.file_name())).await?;
        }
        Ok(())
    }

    async fn commit(
        &self,
        generation: &Generation,
        staging: &Path,
        entries: &[ResourceEntry],
    ) -> Result<(), StoreError> {
        let target = self.generation_dir(generation);
        let existing = fs::try_exists(&target).await?;

        fs::create_dir_all(staging).await?;
        if existing {
            Self::copy_dir_files(&target, staging).await?;
        }
        for entry in entries {
            Self::write_entry(staging, entry).await?;
        }
        let marker = GenerationFile {
            generation: generation.clone(),
        };
        fs::write(staging.join(GENERATION_FILE), serde_json::to_vec_pretty(&marker)?).await?;

        if !existing {
            self.swap_in(staging, &target).await?;
            return Ok(());
        }

        let retired = self.hidden_dir("retired", generation);
        fs::rename(&target, &retired).await?;
        if let Err(e) = self.swap_in(staging, &target).await {
            // Put the previous commit back so the generation stays served
            if let Err(restore) = fs::rename(&retired, &target).await {
                error!(
                    error = %restore,
                    dir = %retired.display(),
                    "Failed to restore replaced generation"
                );
            }
            return Err(e.into());
        }
        if let Err(e) = fs::remove_dir_all(&retired).await {
            warn!(error = %e, dir = %retired.display(), "Failed to remove replaced generation");
        }
        Ok(())
    }

    /// Final rename of a fully written staging directory into place.
    async fn swap_in(&self, staging: &Path, target: &Path) -> std::io::Result<()> {
        #[cfg(test)]
        {
            if self.fail_swap.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("swap disabled"));
            }
        }
        fs::rename(staging, target).await
    }
}

#[async_trait]
impl KeyedBlobStore for DiskBlobStore {
    async fn lookup(
        &self,
        handle: &StoreHandle,
        key: &RequestKey,
    ) -> Result<Option<Response>, StoreError> {
        let dir = self.generation_dir(handle.generation());
        let stem = Self::entry_stem(key);

        let meta = match fs::read(dir.join(format!("{}.{}", stem, META_EXT))).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: EntryFile = serde_json::from_slice(&meta)?;
        if file.key != key.as_str() {
            return Err(StoreError::Corrupt(format!(
                "entry {} holds key {}, expected {}",
                stem, file.key, key
            )));
        }

        let body = match fs::read(dir.join(format!("{}.{}", stem, BODY_EXT))).await {
            Ok(raw) => raw,
            // Generation deleted between the two reads
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(file.meta.with_body(Bytes::from(body))))
    }

    async fn put_all(
        &self,
        handle: &StoreHandle,
        entries: Vec<ResourceEntry>,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let generation = handle.generation();
        let _guard = self.commit_lock.lock().await;
        let staging = self.hidden_dir("staging", generation);

        match self.commit(generation, &staging, &entries).await {
            Ok(()) => {
                debug!(generation = %generation, count = entries.len(), "Committed generation");
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                    if cleanup.kind() != ErrorKind::NotFound {
                        warn!(error = %cleanup, dir = %staging.display(), "Failed to remove staging directory");
                    }
                }
                Err(e)
            }
        }
    }

    async fn list_generations(&self) -> Result<Vec<Generation>, StoreError> {
        let mut generations = Vec::new();
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(generations),
            Err(e) => return Err(e.into()),
        };

        while let Some(dirent) = dir.next_entry().await? {
            let name = dirent.file_name().to_string_lossy().into_owned();
            if name.starts_with(HIDDEN_PREFIX) || !dirent.file_type().await?.is_dir() {
                continue;
            }
            match Self::read_generation_file(&dirent.path()).await {
                Some(generation) if Self::generation_stem(&generation) == name => {
                    generations.push(generation)
                }
                _ => debug!(dir = %name, "Skipping directory that is not a generation"),
            }
        }
        Ok(generations)
    }

    async fn delete(&self, generation: &Generation) -> Result<bool, StoreError> {
        let target = self.generation_dir(generation);
        let retired = self.hidden_dir("retired", generation);
        match fs::rename(&target, &retired).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        fs::remove_dir_all(&retired).await?;
        Ok(true)
    }
}
