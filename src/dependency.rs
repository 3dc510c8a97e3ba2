//! Dependency descriptors and network policy

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension used for every archive cartwheel produces or consumes
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A pinned dependency
///
/// Identity is `(name, version)`. The version is opaque: for buildable
/// dependencies it already carries the toolchain and builder revision, so
/// artifacts produced by different toolchains never share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Library name, also the name of the produced bundles
    pub name: String,
    /// Pinned version string
    pub version: String,
    /// Direct download URL for prebuilt binaries (public binary deps)
    pub source_url: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Name of the archive file as stored in the registry (`<name>.zip`)
    pub fn archive_file_name(&self) -> String {
        format!("{}.{}", self.name, ARCHIVE_EXTENSION)
    }

    /// Bake build context into the version so cache keys differ per toolchain
    pub fn enriched(&self, toolchain: &str, builder_revision: &str) -> Self {
        Self {
            name: self.name.clone(),
            version: format!(
                "{}_swift-{}_builder-{}",
                self.version, toolchain, builder_revision
            ),
            source_url: self.source_url.clone(),
        }
    }

    /// Where this dependency would come from if it had to be downloaded
    pub fn source_description(&self) -> &str {
        self.source_url.as_deref().unwrap_or("<package registry>")
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// How the network may be used during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Download prebuilt binaries and upload the ones built locally
    #[default]
    Online,
    /// Download prebuilt binaries, never upload
    Restricted,
    /// No network at all; only the installed tree and the local cache are used
    Offline,
}

impl NetworkMode {
    pub fn downloads_allowed(&self) -> bool {
        matches!(self, Self::Online | Self::Restricted)
    }

    pub fn uploads_allowed(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Online => "online",
            Self::Restricted => "restricted",
            Self::Offline => "offline",
        };
        write!(f, "{}", name)
    }
}
