//! Detecting which bundles a build touched

use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Modification times of the bundles directly under a directory.
///
/// Taken right before a build and compared right after it. Only
/// meaningful while nothing else writes to the directory.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSnapshot {
    root: PathBuf,
    suffix: String,
    entries: BTreeMap<PathBuf, SystemTime>,
}

impl ArtifactSnapshot {
    /// Record every directory directly in `root` whose name ends with `suffix`
    pub async fn capture(root: &Path, suffix: &str) -> CartwheelResult<Self> {
        let entries = list_mtimes(root, suffix).await?;
        debug!("Snapshot of {}: {} bundle(s)", root.display(), entries.len());
        Ok(Self {
            root: root.to_path_buf(),
            suffix: suffix.to_string(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bundles that are new or whose modification time differs from the
    /// snapshot, in sorted order
    pub async fn changed_bundles(&self) -> CartwheelResult<Vec<PathBuf>> {
        let current = list_mtimes(&self.root, &self.suffix).await?;
        let changed: Vec<PathBuf> = current
            .into_iter()
            .filter(|(path, mtime)| self.entries.get(path) != Some(mtime))
            .map(|(path, _)| path)
            .collect();
        for path in &changed {
            debug!("Changed: {}", path.display());
        }
        Ok(changed)
    }
}

async fn list_mtimes(root: &Path, suffix: &str) -> CartwheelResult<BTreeMap<PathBuf, SystemTime>> {
    let mut entries = BTreeMap::new();
    let mut dir = match tokio::fs::read_dir(root).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
        Err(e) => return Err(CartwheelError::io(format!("listing {}", root.display()), e)),
    };

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| CartwheelError::io(format!("listing {}", root.display()), e))?
    {
        let path = entry.path();
        if !fsutil::has_suffix(&path, suffix) {
            continue;
        }
        let meta = entry
            .metadata()
            .await
            .map_err(|e| CartwheelError::io(format!("inspecting {}", path.display()), e))?;
        if !meta.is_dir() {
            continue;
        }
        let modified = meta
            .modified()
            .map_err(|e| CartwheelError::io(format!("reading mtime of {}", path.display()), e))?;
        entries.insert(path, modified);
    }

    Ok(entries)
}
