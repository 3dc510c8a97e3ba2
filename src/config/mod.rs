//! Configuration management for cartwheel
//!
//! Two TOML files are read: the global file (or the one given with
//! `--config`) and `cartwheel.toml` in the project directory. Tables are
//! merged key by key, the project file winning, before the result is
//! deserialized into [`Config`].

pub mod layout;
pub mod schema;

pub use layout::ProjectLayout;
pub use schema::Config;

use crate::error::{CartwheelError, CartwheelResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the project-local configuration
pub const LOCAL_CONFIG_FILE: &str = "cartwheel.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: Option<PathBuf>,
    required: bool,
}

impl ConfigManager {
    /// Use the default global config file, if it exists
    pub fn new() -> Self {
        Self {
            config_path: Some(Self::default_config_path()),
            required: false,
        }
    }

    /// Use an explicit config file, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: Some(path),
            required: true,
        }
    }

    /// Ignore any global configuration
    pub fn without_global() -> Self {
        Self {
            config_path: None,
            required: false,
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cartwheel")
            .join("config.toml")
    }

    /// `cartwheel.toml` in `project_dir`, if present
    pub fn find_local_config(project_dir: &Path) -> Option<PathBuf> {
        let candidate = project_dir.join(LOCAL_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }

    /// The global/explicit config file path
    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load the global file merged with an optional project file
    pub async fn load_merged(&self, local: Option<&Path>) -> CartwheelResult<Config> {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut last_path = None;

        if let Some(ref path) = self.config_path {
            if path.is_file() {
                debug!("Loading config {}", path.display());
                merge_values(&mut merged, read_value(path).await?);
                last_path = Some(path.clone());
            } else if self.required {
                return Err(CartwheelError::ConfigNotFound(path.clone()));
            } else {
                debug!("Config file {} not found, using defaults", path.display());
            }
        }

        if let Some(path) = local {
            debug!("Loading project config {}", path.display());
            merge_values(&mut merged, read_value(path).await?);
            last_path = Some(path.to_path_buf());
        }

        merged.try_into::<Config>().map_err(|e| CartwheelError::ConfigInvalid {
            path: last_path.unwrap_or_default(),
            reason: e.to_string(),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_value(path: &Path) -> CartwheelResult<toml::Value> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| CartwheelError::io(format!("reading config from {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| CartwheelError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Overlay `overlay` onto `base`: tables merge recursively, anything else
/// is replaced
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
