//! Local archive cache directory

use crate::dependency::Dependency;
use crate::error::CartwheelResult;
use crate::fsutil;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory of `<name>@<version>.zip` archives
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the archive for `dep` lives when cached
    pub fn entry_path(&self, dep: &Dependency) -> PathBuf {
        self.dir
            .join(format!("{}@{}.{}", dep.name, dep.version, crate::dependency::ARCHIVE_EXTENSION))
    }

    /// Cached archive for `dep`, if any
    pub async fn lookup(&self, dep: &Dependency) -> Option<PathBuf> {
        let entry = self.entry_path(dep);
        match tokio::fs::metadata(&entry).await {
            Ok(meta) if meta.is_file() => {
                debug!("Local cache hit: {}", entry.display());
                Some(entry)
            }
            _ => {
                debug!("Local cache miss: {}", entry.display());
                None
            }
        }
    }

    /// Move `archive` into the cache as the entry for `dep`, replacing an
    /// existing entry. Promoting the entry itself is a no-op.
    pub async fn promote(&self, archive: &Path, dep: &Dependency) -> CartwheelResult<PathBuf> {
        let entry = self.entry_path(dep);
        if archive == entry {
            return Ok(entry);
        }
        fsutil::ensure_dir(&self.dir).await?;
        fsutil::remove_path(&entry).await?;
        fsutil::move_path(archive, &entry).await?;
        debug!("Cached {} as {}", dep, entry.display());
        Ok(entry)
    }

    /// [`promote`](Self::promote), logging instead of failing
    pub async fn promote_best_effort(&self, archive: &Path, dep: &Dependency) -> Option<PathBuf> {
        match self.promote(archive, dep).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Could not store {} in the local cache: {}", dep, e);
                None
            }
        }
    }
}
