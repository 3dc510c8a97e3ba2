//! Version ledger
//!
//! One stamp file per dependency (`<build>/<name>.<ext>`) holding the
//! version that is currently installed in the build directory. A stamp
//! whose content equals the wanted version means "installed and correct";
//! nothing else is checked.
//!
//! Stamps are cleared before every install or build attempt so that an
//! interrupted run can never leave a stamp claiming a half-installed
//! dependency is correct.

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default stamp file extension
pub const DEFAULT_STAMP_EXTENSION: &str = "version";

/// Per-dependency installed-version stamps
#[derive(Debug, Clone)]
pub struct VersionLedger {
    root: PathBuf,
    extension: String,
}

impl VersionLedger {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// Path of the stamp for a dependency name
    pub fn stamp_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, self.extension))
    }

    /// Whether the installed version of `dep` is exactly `dep.version`
    pub async fn is_satisfied(&self, dep: &Dependency) -> CartwheelResult<bool> {
        Ok(self.installed_version(&dep.name).await?.as_deref() == Some(dep.version.as_str()))
    }

    /// Version recorded for `name`, if any
    pub async fn installed_version(&self, name: &str) -> CartwheelResult<Option<String>> {
        let path = self.stamp_path(name);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CartwheelError::io(
                format!("reading version stamp {}", path.display()),
                e,
            )),
        }
    }

    /// Delete the stamp for `name` if present
    pub async fn clear(&self, name: &str) -> CartwheelResult<()> {
        let path = self.stamp_path(name);
        debug!("Clearing version stamp {}", path.display());
        fsutil::remove_path(&path).await
    }

    /// Write the stamp for `dep`
    pub async fn record(&self, dep: &Dependency) -> CartwheelResult<()> {
        fsutil::ensure_dir(&self.root).await?;
        let path = self.stamp_path(&dep.name);
        fs::write(&path, &dep.version)
            .await
            .map_err(|e| CartwheelError::io(format!("writing version stamp {}", path.display()), e))?;
        debug!("Recorded {} in {}", dep, path.display());
        Ok(())
    }

    /// Delete stamps of dependencies that are no longer declared.
    ///
    /// Returns the names whose stamps were removed.
    pub async fn prune_unreferenced(&self, deps: &[Dependency]) -> CartwheelResult<Vec<String>> {
        let referenced: HashSet<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        let mut removed = Vec::new();

        for (name, path) in self.stamps().await? {
            if referenced.contains(name.as_str()) {
                continue;
            }
            info!("Removing stale version stamp {}", path.display());
            fsutil::remove_path(&path).await?;
            removed.push(name);
        }

        Ok(removed)
    }

    /// All stamps currently present, sorted by name
    async fn stamps(&self) -> CartwheelResult<Vec<(String, PathBuf)>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CartwheelError::io(format!("listing {}", self.root.display()), e)),
        };

        let suffix = format!(".{}", self.extension);
        let mut stamps = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CartwheelError::io(format!("listing {}", self.root.display()), e))?
        {
            let path = entry.path();
            if !is_file(&path).await {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(name) = file_name.strip_suffix(&suffix) {
                stamps.push((name.to_string(), path));
            }
        }

        stamps.sort();
        Ok(stamps)
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}
