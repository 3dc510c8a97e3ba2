//! Remote package registry and plain HTTP downloads
//!
//! Two seams are defined here:
//! - [`PackageRegistry`]: the project-scoped store cartwheel publishes
//!   built archives to and downloads them back from
//! - [`Fetcher`]: plain URL downloads for public prebuilt binaries and
//!   the JSON binary specs that point at them
//!
//! The concrete implementations are blocking `ureq` clients run on the
//! blocking thread pool; the calling step waits for the transfer while the
//! progress indicator is updated from the transfer thread.

mod gitlab;
mod http;

pub use gitlab::GitLabRegistry;
pub use http::HttpClient;

use crate::dependency::Dependency;
use crate::error::{CartwheelError, CartwheelResult};
use crate::ui::TransferProgress;
use async_trait::async_trait;
use std::path::Path;

/// Address of one package file in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub file_name: String,
}

impl PackageRef {
    pub fn for_dependency(dep: &Dependency) -> Self {
        Self {
            name: dep.name.clone(),
            version: dep.version.clone(),
            file_name: dep.archive_file_name(),
        }
    }
}

/// What the registry answered to an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status code
    pub status: u16,
    /// Free-form acknowledgement message, if the registry sent one
    pub message: Option<String>,
}

impl UploadReceipt {
    /// The status code is the contract; the message is diagnostic only
    pub fn is_accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Project-scoped package storage
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Whether the registry has enough settings to be contacted at all
    fn is_configured(&self) -> bool {
        true
    }

    /// Versions published under exactly `name`
    async fn list_versions(&self, name: &str) -> CartwheelResult<Vec<String>>;

    /// Download a package file to `destination`, returning its size
    async fn download(
        &self,
        package: &PackageRef,
        destination: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<u64>;

    /// Upload `file` as the given package file
    async fn upload(
        &self,
        package: &PackageRef,
        file: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<UploadReceipt>;
}

/// Plain URL downloads
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `destination`, returning its size
    async fn fetch_to(
        &self,
        url: &str,
        destination: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<u64>;

    /// Fetch a small text document (JSON binary specs)
    async fn fetch_text(&self, url: &str) -> CartwheelResult<String>;
}

/// Stand-in used when no registry settings were given.
///
/// Every operation fails with [`CartwheelError::RegistryNotConfigured`],
/// which the cache layer treats like any other remote miss.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredRegistry {
    missing: &'static str,
}

impl UnconfiguredRegistry {
    pub fn new(missing: &'static str) -> Self {
        Self { missing }
    }
}

#[async_trait]
impl PackageRegistry for UnconfiguredRegistry {
    fn is_configured(&self) -> bool {
        false
    }

    async fn list_versions(&self, _name: &str) -> CartwheelResult<Vec<String>> {
        Err(CartwheelError::RegistryNotConfigured(self.missing))
    }

    async fn download(
        &self,
        _package: &PackageRef,
        _destination: &Path,
        _progress: TransferProgress,
    ) -> CartwheelResult<u64> {
        Err(CartwheelError::RegistryNotConfigured(self.missing))
    }

    async fn upload(
        &self,
        _package: &PackageRef,
        _file: &Path,
        _progress: TransferProgress,
    ) -> CartwheelResult<UploadReceipt> {
        Err(CartwheelError::RegistryNotConfigured(self.missing))
    }
}
