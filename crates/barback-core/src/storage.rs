//! Disk storage collaborator.
//!
//! A [`Storage`] is a namespace rooted at a directory. The durable disk (where
//! uploaded and imported images live) and the scratch disk (where archives are
//! extracted) are two separate instances.

use crate::error::{BarbackError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Relative-path file storage.
pub trait Storage: Send + Sync {
    /// Resolve a relative path to an absolute one inside this namespace.
    fn path(&self, relative: &str) -> Result<PathBuf>;

    /// Write bytes, creating parent directories as needed.
    fn put(&self, relative: &str, bytes: &[u8]) -> Result<()>;

    /// Copy an absolute source file into this namespace.
    fn copy(&self, source: &Path, relative: &str) -> Result<()>;

    /// Recursively delete a directory. Deleting a missing directory succeeds.
    fn delete_directory(&self, relative: &str) -> Result<()>;

    fn exists(&self, relative: &str) -> Result<bool> {
        Ok(self.path(relative)?.exists())
    }
}

/// Local filesystem storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    /// Create storage rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute root of this namespace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BarbackError::io_with_path(e, parent))?;
            }
        }
        Ok(())
    }
}

/// Reject paths that would escape the storage root.
fn validate_relative(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(BarbackError::validation(
                    "path",
                    format!("'{}' must stay inside the storage root", relative),
                ))
            }
        }
    }
    Ok(path)
}

impl Storage for LocalDisk {
    fn path(&self, relative: &str) -> Result<PathBuf> {
        let relative = validate_relative(relative)?;
        Ok(self.root.join(relative))
    }

    fn put(&self, relative: &str, bytes: &[u8]) -> Result<()> {
        let target = self.path(relative)?;
        Self::ensure_parent(&target)?;
        fs::write(&target, bytes).map_err(|e| BarbackError::io_with_path(e, &target))?;
        debug!(path = %target.display(), bytes = bytes.len(), "Stored file");
        Ok(())
    }

    fn copy(&self, source: &Path, relative: &str) -> Result<()> {
        let target = self.path(relative)?;
        Self::ensure_parent(&target)?;
        fs::copy(source, &target).map_err(|e| BarbackError::FileCopy {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn delete_directory(&self, relative: &str) -> Result<()> {
        let target = self.path(relative)?;
        match fs::remove_dir_all(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BarbackError::io_with_path(e, target)),
        }
    }
}
