//! Archive packing and unpacking
//!
//! cartwheel does not implement the zip format; it drives the system
//! `zip`/`unzip` tools through the shell runner.

use crate::error::{CartwheelError, CartwheelResult};
use crate::fsutil;
use crate::shell::{CommandSpec, OutputLevel, ShellRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Creates and extracts recursive archives of bundle directories
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive `items` (files or directories) into `destination`
    async fn pack(&self, items: &[PathBuf], destination: &Path) -> CartwheelResult<()>;

    /// Extract `archive` into the existing directory `destination`
    async fn unpack(&self, archive: &Path, destination: &Path) -> CartwheelResult<()>;
}

/// `zip -rTyq` / `unzip -q`
pub struct ZipTool {
    shell: Arc<dyn ShellRunner>,
}

impl ZipTool {
    pub fn new(shell: Arc<dyn ShellRunner>) -> Self {
        Self { shell }
    }

    /// Build the zip invocation.
    ///
    /// Items sharing one parent directory are stored by file name only, so
    /// archives unpack to `X.xcframework` instead of the full build path.
    /// Paths are made absolute first since zip runs inside that parent.
    fn pack_command(items: &[PathBuf], destination: &Path) -> CartwheelResult<CommandSpec> {
        if items.is_empty() {
            return Err(CartwheelError::Internal("nothing to archive".to_string()));
        }
        let items = items
            .iter()
            .map(|item| fsutil::absolute(item))
            .collect::<CartwheelResult<Vec<_>>>()?;
        let destination = fsutil::absolute(destination)?;
        let first = &items[0];
        let common_parent = first
            .parent()
            .filter(|parent| items.iter().all(|item| item.parent() == Some(*parent)));

        let mut spec = CommandSpec::new("zip")
            .arg("-rTyq")
            .path_arg(&destination)
            .output(OutputLevel::Debug);

        match common_parent {
            Some(parent) => {
                spec = spec.current_dir(parent);
                for item in &items {
                    let name = item
                        .file_name()
                        .ok_or_else(|| CartwheelError::PathNotFound(item.clone()))?;
                    spec = spec.arg(name.to_string_lossy().into_owned());
                }
            }
            None => {
                for item in &items {
                    spec = spec.path_arg(item);
                }
            }
        }

        Ok(spec)
    }
}

#[async_trait]
impl Archiver for ZipTool {
    async fn pack(&self, items: &[PathBuf], destination: &Path) -> CartwheelResult<()> {
        let spec = Self::pack_command(items, destination)?;
        self.shell.run(&spec).await.map(|_| ())
    }

    async fn unpack(&self, archive: &Path, destination: &Path) -> CartwheelResult<()> {
        let spec = CommandSpec::new("unzip")
            .arg("-q")
            .path_arg(archive)
            .arg("-d")
            .path_arg(destination)
            .output(OutputLevel::Silent);
        self.shell.run(&spec).await.map(|_| ())
    }
}
