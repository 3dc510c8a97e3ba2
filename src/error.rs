//! Error types for cartwheel
//!
//! All modules use `CartwheelResult<T>` as their return type. Whether an
//! error is fatal is decided by the caller: cache and registry misses are
//! downgraded to warnings at the resolver layer, everything that reaches
//! `main` aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cartwheel operations
pub type CartwheelResult<T> = Result<T, CartwheelError>;

/// All errors that can occur in cartwheel
#[derive(Error, Debug)]
pub enum CartwheelError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Registry is not configured: {0}")]
    RegistryNotConfigured(&'static str),

    // Manifest errors
    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("Binary dependency {0} must specify either `url` or `json_url`")]
    BinarySourceMissing(String),

    #[error("Version {version} of {name} is not listed in {spec_url}")]
    BinaryVersionUnlisted {
        name: String,
        version: String,
        spec_url: String,
    },

    #[error("Could not detect toolchain version from `{command}` output")]
    ToolchainUndetected { command: String },

    // Pipeline errors
    #[error("Failed to build {name}")]
    DependencyBuild {
        name: String,
        #[source]
        source: Box<CartwheelError>,
    },

    #[error("Unable to obtain binary-only dependency {name} {version} from {source_url}")]
    BinaryUnavailable {
        name: String,
        version: String,
        source_url: String,
    },

    #[error("Failed to repackage {bundle}")]
    Repackage {
        bundle: String,
        #[source]
        source: Box<CartwheelError>,
    },

    #[error("Not a framework bundle: {0}")]
    NotAFramework(PathBuf),

    #[error("Output path must end with .xcframework: {0}")]
    NotAMultiPlatformBundle(PathBuf),

    // Registry errors
    #[error("Upload of {name} {version} was rejected (HTTP {status}): {message}")]
    UploadRejected {
        name: String,
        version: String,
        status: u16,
        message: String,
    },

    #[error("Package {name} {version} already exists in the registry")]
    PackageExists { name: String, version: String },

    #[error("Info.plist not found in {0}")]
    InfoPlistNotFound(PathBuf),

    #[error("CFBundleShortVersionString is not set in {0}")]
    InfoPlistVersionMissing(PathBuf),

    #[error("HTTP error: {context}")]
    Http {
        context: String,
        #[source]
        source: Box<ureq::Error>,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with code {code}: {command}\n{output}")]
    CommandExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Interrupted")]
    Interrupted,

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CartwheelError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an HTTP transfer error
    pub fn http(context: impl Into<String>, source: ureq::Error) -> Self {
        Self::Http {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RegistryNotConfigured(_) => {
                Some("Set [registry] in cartwheel.toml or pass --registry-url/--registry-project")
            }
            Self::ManifestNotFound(_) => Some("Run: carthage update --no-build"),
            Self::BinaryUnavailable { .. } => {
                Some("Check network access or switch --network away from offline")
            }
            Self::ToolchainUndetected { .. } => Some("Make sure `swift --version` works"),
            Self::PackageExists { .. } => Some("Bump the framework version before uploading"),
            _ => None,
        }
    }
}
