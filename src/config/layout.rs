//! Absolute project paths

use super::schema::PathsConfig;
use crate::error::CartwheelResult;
use crate::fsutil;
use std::path::{Path, PathBuf};

/// Every directory and file a run touches, resolved against the project
/// directory once and handed to each component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    pub cartfile_resolved: PathBuf,
    pub binary_manifest: PathBuf,
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl ProjectLayout {
    pub fn resolve(project_dir: &Path, paths: &PathsConfig) -> CartwheelResult<Self> {
        let project_dir = fsutil::absolute(project_dir)?;
        let under = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_dir.join(path)
            }
        };

        Ok(Self {
            cartfile_resolved: under(&paths.cartfile_resolved),
            binary_manifest: under(&paths.binary_manifest),
            build_dir: under(&paths.build_dir),
            cache_dir: under(&paths.cache_dir),
            temp_dir: under(&paths.temp_dir),
            project_dir,
        })
    }
}
