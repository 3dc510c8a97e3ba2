//! Installing downloaded or cached archives into the build tree

use crate::archive::Archiver;
use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil::{self, ScratchPath};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const SCRATCH_PREFIX: &str = "unzipped_";
const RESOURCE_FORK_DIR: &str = "__MACOSX";

/// Unpacks an archive and moves its bundles into place.
///
/// `*.xcframework` bundles go to the build root. Any remaining
/// `*.framework` bundles go to `<build root>/<platform>/`.
pub struct Installer {
    archiver: Arc<dyn Archiver>,
    build_root: PathBuf,
    platform: String,
}

impl Installer {
    pub fn new(archiver: Arc<dyn Archiver>, build_root: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            archiver,
            build_root: build_root.into(),
            platform: platform.into(),
        }
    }

    /// Install the bundles contained in `archive`, returning their new paths
    pub async fn install(&self, archive: &Path) -> CartwheelResult<Vec<PathBuf>> {
        let parent = archive.parent().unwrap_or_else(|| Path::new("."));
        let scratch_dir = parent.join(format!("{}{}", SCRATCH_PREFIX, fsutil::stem(archive)));
        fsutil::remove_path(&scratch_dir).await?;
        fsutil::ensure_dir(&scratch_dir).await?;
        let scratch = ScratchPath::new(scratch_dir);

        self.archiver.unpack(archive, scratch.path()).await?;
        fsutil::remove_path(&scratch.path().join(RESOURCE_FORK_DIR)).await?;

        let mut installed = Vec::new();
        for bundle in fsutil::find_bundles(scratch.path(), ".xcframework").await? {
            installed.push(self.place(&bundle, &self.build_root).await?);
        }

        let platform_dir = self.build_root.join(&self.platform);
        for bundle in fsutil::find_bundles(scratch.path(), ".framework").await? {
            installed.push(self.place(&bundle, &platform_dir).await?);
        }

        debug!("Installed {} bundle(s) from {}", installed.len(), archive.display());
        Ok(installed)
    }

    async fn place(&self, bundle: &Path, dir: &Path) -> CartwheelResult<PathBuf> {
        let name = bundle
            .file_name()
            .ok_or_else(|| CartwheelError::PathNotFound(bundle.to_path_buf()))?;
        let destination = dir.join(name);
        fsutil::remove_path(&destination).await?;
        fsutil::move_path(bundle, &destination).await?;
        debug!("  {} -> {}", bundle.display(), destination.display());
        Ok(destination)
    }
}
