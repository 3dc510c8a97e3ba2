//! Building a dependency from source and publishing what changed

use crate::archive::Archiver;
use crate::build::DependencyBuilder;
use crate::cache::{LocalCache, RemoteCache};
use crate::changes::ArtifactSnapshot;
use crate::dependency::Dependency;
use crate::error::CartwheelResult;
use crate::fsutil::{self, ScratchPath};
use crate::ledger::VersionLedger;
use crate::registry::UploadReceipt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const BUNDLE_SUFFIX: &str = ".xcframework";

/// What happened to the archive of a freshly built dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The registry accepted the archive
    Uploaded(UploadReceipt),
    /// The registry already had this exact version
    AlreadyPublished,
    /// The network mode does not allow uploads
    UploadsDisabled,
    /// No registry settings were given
    RegistryUnconfigured,
    /// The build did not modify any bundle, so nothing was packaged
    NothingChanged,
}

pub struct Publisher {
    ledger: VersionLedger,
    builder: Arc<dyn DependencyBuilder>,
    archiver: Arc<dyn Archiver>,
    local: LocalCache,
    remote: Arc<RemoteCache>,
    build_root: PathBuf,
    temp_dir: PathBuf,
}

impl Publisher {
    pub fn new(
        ledger: VersionLedger,
        builder: Arc<dyn DependencyBuilder>,
        archiver: Arc<dyn Archiver>,
        local: LocalCache,
        remote: Arc<RemoteCache>,
        build_root: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ledger,
            builder,
            archiver,
            local,
            remote,
            build_root: build_root.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Build `dep`, package the bundles the build changed, keep the archive
    /// in the local cache and upload it when allowed.
    ///
    /// Build, packaging and upload failures are errors. Local caching and
    /// removal of the temporary archive are attempted on every path.
    pub async fn build_and_publish(&self, dep: &Dependency, uploads_allowed: bool) -> CartwheelResult<PublishOutcome> {
        self.ledger.clear(&dep.name).await?;

        let snapshot = ArtifactSnapshot::capture(&self.build_root, BUNDLE_SUFFIX).await?;
        if let Err(e) = self.builder.build(dep).await {
            error!("Build of {} failed: {}", dep, e);
            return Err(e);
        }
        self.ledger.record(dep).await?;

        let changed = snapshot.changed_bundles().await?;
        if changed.is_empty() {
            warn!("Building {} did not change any bundle, nothing to package", dep);
            return Ok(PublishOutcome::NothingChanged);
        }
        info!("{} produced {} changed bundle(s)", dep, changed.len());

        fsutil::ensure_dir(&self.temp_dir).await?;
        let archive = self.temp_dir.join(dep.archive_file_name());
        fsutil::remove_path(&archive).await?;
        let scratch = ScratchPath::new(archive.clone());

        self.archiver.pack(&changed, &archive).await?;

        let outcome = self.publish(dep, &archive, uploads_allowed).await;
        self.local.promote_best_effort(&archive, dep).await;
        drop(scratch);

        if let Err(ref e) = outcome {
            error!("Publishing {} failed: {}", dep, e);
        }
        outcome
    }

    async fn publish(&self, dep: &Dependency, archive: &Path, uploads_allowed: bool) -> CartwheelResult<PublishOutcome> {
        if !uploads_allowed {
            info!("Uploads disabled, keeping {} local", dep);
            return Ok(PublishOutcome::UploadsDisabled);
        }
        if !self.remote.uploads_configured() {
            warn!("No registry configured, skipping upload of {}", dep);
            return Ok(PublishOutcome::RegistryUnconfigured);
        }
        if self.remote.already_published(dep).await {
            info!("{} is already published, skipping upload", dep);
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let receipt = self.remote.upload(dep, archive).await?;
        info!("Uploaded {}", dep);
        Ok(PublishOutcome::Uploaded(receipt))
    }
}
