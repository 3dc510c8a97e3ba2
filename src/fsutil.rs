//! Filesystem helpers shared by the installer, publisher and repackager
//!
//! Bundles are directories that may contain relative symlinks
//! (`Versions/Current`), so copies preserve links instead of following them.

use crate::error::{CartwheelError, CartwheelResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Remove a file or directory tree. Missing paths are not an error.
pub async fn remove_path(path: &Path) -> CartwheelResult<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CartwheelError::io(format!("inspecting {}", path.display()), e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CartwheelError::io(format!("removing {}", path.display()), e)),
    }
}

/// Create a directory and all parents
pub async fn ensure_dir(path: &Path) -> CartwheelResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| CartwheelError::io(format!("creating directory {}", path.display()), e))
}

/// Move a file or directory, falling back to copy+remove across filesystems
pub async fn move_path(from: &Path, to: &Path) -> CartwheelResult<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent).await?;
    }

    match fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CartwheelError::PathNotFound(from.to_path_buf()))
        }
        Err(e) => debug!("rename {} failed ({}), copying instead", from.display(), e),
    }

    let meta = fs::symlink_metadata(from)
        .await
        .map_err(|e| CartwheelError::io(format!("inspecting {}", from.display()), e))?;
    if meta.is_dir() {
        copy_dir_all(from, to).await?;
    } else {
        fs::copy(from, to).await.map_err(|e| {
            CartwheelError::io(format!("copying {} to {}", from.display(), to.display()), e)
        })?;
    }
    remove_path(from).await
}

/// Recursively copy a directory, recreating symlinks as symlinks
pub async fn copy_dir_all(from: &Path, to: &Path) -> CartwheelResult<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((src_dir, dst_dir)) = pending.pop() {
        ensure_dir(&dst_dir).await?;
        let mut entries = fs::read_dir(&src_dir)
            .await
            .map_err(|e| CartwheelError::io(format!("listing {}", src_dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CartwheelError::io(format!("listing {}", src_dir.display()), e))?
        {
            let src = entry.path();
            let dst = dst_dir.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CartwheelError::io(format!("inspecting {}", src.display()), e))?;

            if file_type.is_symlink() {
                copy_symlink(&src, &dst).await?;
            } else if file_type.is_dir() {
                pending.push((src, dst));
            } else {
                fs::copy(&src, &dst).await.map_err(|e| {
                    CartwheelError::io(format!("copying {} to {}", src.display(), dst.display()), e)
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn copy_symlink(src: &Path, dst: &Path) -> CartwheelResult<()> {
    let target = fs::read_link(src)
        .await
        .map_err(|e| CartwheelError::io(format!("reading link {}", src.display()), e))?;
    fs::symlink(&target, dst)
        .await
        .map_err(|e| CartwheelError::io(format!("creating link {}", dst.display()), e))
}

#[cfg(not(unix))]
async fn copy_symlink(src: &Path, dst: &Path) -> CartwheelResult<()> {
    fs::copy(src, dst)
        .await
        .map(|_| ())
        .map_err(|e| CartwheelError::io(format!("copying {}", src.display()), e))
}

/// Find directories under `root` whose name ends with `suffix`.
///
/// Matching directories are not descended into, so the frameworks nested
/// inside an `.xcframework` are not reported separately. Results are sorted.
pub async fn find_bundles(root: &Path, suffix: &str) -> CartwheelResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| CartwheelError::io(format!("listing {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CartwheelError::io(format!("listing {}", dir.display()), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| CartwheelError::io(format!("inspecting {}", entry.path().display()), e))?;
            if !file_type.is_dir() {
                continue;
            }
            let path = entry.path();
            if has_suffix(&path, suffix) {
                found.push(path);
            } else {
                pending.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Whether the final path component ends with `suffix`
pub fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// `path` made absolute against the current directory, without touching
/// the filesystem
pub fn absolute(path: &Path) -> CartwheelResult<PathBuf> {
    std::path::absolute(path).map_err(|e| CartwheelError::io(format!("resolving {}", path.display()), e))
}

/// File name without its last extension, as an owned string
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An exclusively owned scratch file or directory.
///
/// The path is removed when the guard is dropped, which covers early
/// returns, errors and a cancelled future (Ctrl-C drops the pipeline).
#[derive(Debug)]
pub struct ScratchPath {
    path: PathBuf,
}

impl ScratchPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchPath {
    fn drop(&mut self) {
        let result = match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&self.path),
            Ok(_) => std::fs::remove_file(&self.path),
            Err(_) => return,
        };
        if let Err(e) = result {
            warn!("Failed to remove scratch path {}: {}", self.path.display(), e);
        }
    }
}
