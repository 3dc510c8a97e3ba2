//! Remote archive tier and upload gate

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil;
use crate::registry::{Fetcher, PackageRef, PackageRegistry, UploadReceipt};
use crate::ui::{TransferProgress, UiContext};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Downloads archives from a dependency's own URL or the package registry,
/// and uploads built archives back to the registry
pub struct RemoteCache {
    registry: Arc<dyn PackageRegistry>,
    fetcher: Arc<dyn Fetcher>,
    ui: UiContext,
}

impl RemoteCache {
    pub fn new(registry: Arc<dyn PackageRegistry>, fetcher: Arc<dyn Fetcher>, ui: UiContext) -> Self {
        Self {
            registry,
            fetcher,
            ui,
        }
    }

    pub fn uploads_configured(&self) -> bool {
        self.registry.is_configured()
    }

    /// Download the archive for `dep` into `destination`.
    ///
    /// Returns `false` on any failure; a partial file is removed.
    pub async fn download(&self, dep: &Dependency, destination: &Path) -> bool {
        let progress = TransferProgress::start(&self.ui, format!("Downloading {}", dep));
        let result = match dep.source_url {
            Some(ref url) => self.fetcher.fetch_to(url, destination, progress).await,
            None => {
                self.registry
                    .download(&PackageRef::for_dependency(dep), destination, progress)
                    .await
            }
        };

        match result {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", dep, bytes);
                true
            }
            Err(e) => {
                warn!("Remote cache miss for {} from {}: {}", dep, dep.source_description(), e);
                if let Err(cleanup) = fsutil::remove_path(destination).await {
                    debug!("Could not remove partial download: {}", cleanup);
                }
                false
            }
        }
    }

    /// Whether the registry already holds exactly `dep.version` under
    /// `dep.name`. A failed query is an error.
    pub async fn is_published(&self, dep: &Dependency) -> CartwheelResult<bool> {
        let versions = self.registry.list_versions(&dep.name).await?;
        Ok(versions.iter().any(|v| *v == dep.version))
    }

    /// [`is_published`](Self::is_published) for the publish step, where a
    /// failed query counts as not published
    pub async fn already_published(&self, dep: &Dependency) -> bool {
        match self.is_published(dep).await {
            Ok(published) => published,
            Err(e) => {
                warn!("Could not query the registry for {}: {}", dep, e);
                false
            }
        }
    }

    /// Upload `archive` as `(dep.name, dep.version)`. A rejected upload is
    /// an error.
    pub async fn upload(&self, dep: &Dependency, archive: &Path) -> CartwheelResult<UploadReceipt> {
        let progress = TransferProgress::start(&self.ui, format!("Uploading {}", dep));
        let receipt = self
            .registry
            .upload(&PackageRef::for_dependency(dep), archive, progress)
            .await?;

        if !receipt.is_accepted() {
            return Err(CartwheelError::UploadRejected {
                name: dep.name.clone(),
                version: dep.version.clone(),
                status: receipt.status,
                message: receipt.message.clone().unwrap_or_default(),
            });
        }
        debug!(
            "Registry accepted {} with HTTP {} {}",
            dep,
            receipt.status,
            receipt.message.as_deref().unwrap_or("")
        );
        Ok(receipt)
    }
}
