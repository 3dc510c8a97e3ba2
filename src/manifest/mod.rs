//! Dependency manifests
//!
//! Source dependencies come from `Cartfile.resolved`, binary-only
//! dependencies from a YAML manifest. Both lists keep file order, which is
//! the order the pipeline processes them in.

pub mod binary;
pub mod resolved;

pub use binary::BinaryManifest;

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::registry::Fetcher;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// All dependencies of a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Built from source when no cache has them
    pub buildable: Vec<Dependency>,
    /// Only ever downloaded
    pub binary_only: Vec<Dependency>,
}

impl Manifest {
    /// Read both manifests. `Cartfile.resolved` is required; a missing
    /// binary manifest means there are no binary-only dependencies.
    /// `fetcher` is `None` when the network must not be used.
    pub async fn load(
        cartfile_resolved: &Path,
        binary_manifest: &Path,
        fetcher: Option<&dyn Fetcher>,
    ) -> CartwheelResult<Self> {
        let resolved_text = match tokio::fs::read_to_string(cartfile_resolved).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CartwheelError::ManifestNotFound(cartfile_resolved.to_path_buf()))
            }
            Err(e) => {
                return Err(CartwheelError::io(
                    format!("reading {}", cartfile_resolved.display()),
                    e,
                ))
            }
        };
        let buildable = resolved::parse(&resolved_text, cartfile_resolved)?;

        let binary_only = match tokio::fs::read_to_string(binary_manifest).await {
            Ok(text) => {
                let manifest = BinaryManifest::from_yaml(&text).map_err(|e| CartwheelError::ManifestInvalid {
                    path: binary_manifest.to_path_buf(),
                    reason: e.to_string(),
                })?;
                manifest.resolve(fetcher).await?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, no binary-only dependencies", binary_manifest.display());
                Vec::new()
            }
            Err(e) => {
                return Err(CartwheelError::io(
                    format!("reading {}", binary_manifest.display()),
                    e,
                ))
            }
        };

        info!(
            "Found {} buildable and {} binary-only dependencies",
            buildable.len(),
            binary_only.len()
        );
        Ok(Self {
            buildable,
            binary_only,
        })
    }

    /// Every dependency, buildable first
    pub fn all(&self) -> Vec<Dependency> {
        self.buildable
            .iter()
            .chain(self.binary_only.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buildable.is_empty() && self.binary_only.is_empty()
    }
}
