//! JSON persistence for the validated-hash table
//!
//! The store itself never touches disk. Its owner loads records at startup
//! with [`CacheFile::load`] and periodically calls [`CacheFile::flush`],
//! which writes only when the store reports unsaved changes.

use crate::entry::CacheEntry;
use crate::store::HashStore;
use crate::{
    Result,
    error::{InternalError, IoError},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Current on-disk format version
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// Location of a persisted hash table
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Refer to a cache file (nothing is read yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records; a missing file yields an empty table
    pub async fn load(&self) -> Result<Vec<CacheEntry>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(IoError::from_std(e).with_path(&self.path).into()),
        };
        let document: CacheDocument = serde_json::from_str(&data).map_err(|e| {
            InternalError::cache_format(format!("{}: {e}", self.path.display()))
        })?;

        if document.version != CACHE_FORMAT_VERSION {
            return Err(InternalError::cache_format(format!(
                "{}: unsupported version {}",
                self.path.display(),
                document.version
            ))
            .into());
        }

        debug!(
            "Loaded {} record(s) from {}",
            document.entries.len(),
            self.path.display()
        );
        Ok(document.entries)
    }

    /// Load records straight into `store`
    pub async fn load_into(&self, store: &HashStore) -> Result<usize> {
        let entries = self.load().await?;
        let count = entries.len();
        store.restore(entries);
        Ok(count)
    }

    /// Write `entries`, replacing the file atomically
    pub async fn save(&self, entries: &[CacheEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| IoError::from_std(e).with_path(parent))?;
        }

        let document = CacheDocument {
            version: CACHE_FORMAT_VERSION,
            entries: entries.to_vec(),
        };
        let data = serde_json::to_vec_pretty(&document)?;

        let tmp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|e| IoError::from_std(e).with_path(&tmp_path))?;
        file.write_all(&data)
            .await
            .map_err(|e| IoError::from_std(e).with_path(&tmp_path))?;
        file.sync_all()
            .await
            .map_err(|e| IoError::from_std(e).with_path(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| IoError::from_std(e).with_path(&self.path))?;
        Ok(())
    }

    /// Save the store if it has unsaved changes
    ///
    /// Returns whether anything was written.
    pub async fn flush(&self, store: &HashStore) -> Result<bool> {
        if !store.has_unsaved_changes() {
            return Ok(false);
        }

        let entries = store.snapshot();
        self.save(&entries).await?;
        store.mark_saved();
        info!(
            "Saved {} hash record(s) to {}",
            entries.len(),
            self.path.display()
        );
        Ok(true)
    }
}
