//! Configuration schema for cartwheel
//!
//! Settings come from `cartwheel.toml` in the project directory, merged
//! over the global `~/.config/cartwheel/config.toml`. Every section and
//! field is optional.

use crate::dependency::NetworkMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project file locations
    pub paths: PathsConfig,

    /// Carthage and toolchain settings
    pub build: BuildConfig,

    /// Package registry used as the remote cache
    pub registry: RegistryConfig,

    /// Network policy
    pub network: NetworkConfig,

    /// Fat framework conversion
    pub repackage: RepackageConfig,
}

/// Paths, relative to the project directory unless absolute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Pinned source dependencies
    pub cartfile_resolved: PathBuf,

    /// Binary-only dependencies (YAML)
    pub binary_manifest: PathBuf,

    /// Carthage build output root
    pub build_dir: PathBuf,

    /// Local archive cache
    pub cache_dir: PathBuf,

    /// Scratch space for downloads and packaging
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cartfile_resolved: PathBuf::from("Cartfile.resolved"),
            binary_manifest: PathBuf::from("CartfileBinary.yml"),
            build_dir: PathBuf::from("Carthage/Build"),
            cache_dir: PathBuf::from("etc/cached-binaries"),
            temp_dir: PathBuf::from("Carthage/temp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Carthage executable
    pub carthage_command: String,

    /// Platform passed to `carthage build --platform`
    pub platform: String,

    /// Bumped whenever the build recipe changes, invalidating every cache entry
    pub builder_revision: String,

    /// Extension of the version stamp files
    pub stamp_extension: String,

    /// Compiler whose `--version` output is baked into cache keys
    pub toolchain_command: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            carthage_command: "carthage".to_string(),
            platform: "iOS".to_string(),
            builder_revision: "2".to_string(),
            stamp_extension: crate::ledger::DEFAULT_STAMP_EXTENSION.to_string(),
            toolchain_command: "swift".to_string(),
        }
    }
}

/// GitLab package registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// API root, e.g. `https://gitlab.example.com/api/v4`
    pub api_url: Option<String>,

    /// Numeric id or URL-encoded path of the project holding the packages
    pub project_id: Option<String>,

    /// Personal or project access token
    pub token: Option<String>,
}

impl RegistryConfig {
    /// Name of the first missing required setting
    pub fn missing_setting(&self) -> Option<&'static str> {
        if self.api_url.as_deref().map_or(true, str::is_empty) {
            Some("registry.api_url")
        } else if self.project_id.as_deref().map_or(true, str::is_empty) {
            Some("registry.project_id")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// online: download and upload, restricted: download only, offline: neither
    pub mode: NetworkMode,

    /// Timeout for a whole transfer, in seconds
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: NetworkMode::Online,
            timeout_secs: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepackageConfig {
    /// Architecture of the simulator slice
    pub simulator_arch: String,

    /// Architecture of the device slice
    pub device_arch: String,

    /// Framework bundle names never converted
    pub skip: Vec<String>,
}

impl Default for RepackageConfig {
    fn default() -> Self {
        Self {
            simulator_arch: "x86_64".to_string(),
            device_arch: "arm64".to_string(),
            skip: vec!["Firebase.framework".to_string()],
        }
    }
}

impl Config {
    /// Copy safe to print: the registry token is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.registry.token.is_some() {
            copy.registry.token = Some("********".to_string());
        }
        copy
    }
}
