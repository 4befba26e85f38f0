//! Centralized configuration for barback.
//!
//! Compile-time tunables are grouped into associated-constant structs; the
//! on-disk layout is resolved at runtime into [`BarbackPaths`].

use std::path::{Path, PathBuf};

/// Placeholder hash sampling parameters.
pub struct PlaceholderConfig;

impl PlaceholderConfig {
    /// Longest edge of the down-sampled image fed to the hash transform.
    pub const MAX_EDGE: u32 = 100;
    /// JPEG quality used to normalize sampling before hashing.
    pub const SAMPLE_QUALITY: u8 = 20;
}

/// Storage layout for durable and scratch disks.
pub struct StorageConfig;

impl StorageConfig {
    /// Durable directory for cocktail images copied out of an archive.
    pub const COCKTAIL_IMAGES_DIR: &'static str = "cocktails";
    /// Durable directory for ingredient images copied out of an archive.
    pub const INGREDIENT_IMAGES_DIR: &'static str = "ingredients";
    /// Durable namespace for freshly uploaded images.
    pub const UPLOAD_NAMESPACE: &'static str = "temp";
    /// Archive directory holding cocktail image assets.
    pub const ARCHIVE_COCKTAIL_ASSETS: &'static str = "uploads/cocktails";
    /// Archive directory holding ingredient image assets.
    pub const ARCHIVE_INGREDIENT_ASSETS: &'static str = "uploads/ingredients";
    /// Scratch prefix for per-run extraction directories.
    pub const EXTRACTION_PREFIX: &'static str = "temp/export/import_";
    /// Fallback extension when the source format is unknown.
    pub const DEFAULT_EXTENSION: &'static str = "jpg";
}

/// Defaults for scraped recipe imports.
pub struct ImportConfig;

impl ImportConfig {
    /// Owner of recipes and images created without an explicit user.
    pub const DEFAULT_OWNER_ID: i64 = 1;
    /// Catalog scope used when none is given.
    pub const DEFAULT_SCOPE_ID: i64 = 1;
    /// Description prefix of catalog entries created from a scrape.
    pub const PROVENANCE_PREFIX: &'static str = "Created by scraper from ";
    /// Maximum size of a remotely fetched image (10MB).
    pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
    /// Timeout for fetching a remote image.
    pub const FETCH_TIMEOUT_SECS: u64 = 15;
}

/// On-disk locations derived from a single data directory.
#[derive(Debug, Clone)]
pub struct BarbackPaths {
    pub data_dir: PathBuf,
}

impl BarbackPaths {
    pub const DATABASE_FILE: &'static str = "barback.db";
    pub const STORAGE_DIR: &'static str = "storage";
    pub const SCRATCH_DIR: &'static str = "scratch";

    /// Derive every location from `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// SQLite database file.
    pub fn database(&self) -> PathBuf {
        self.data_dir.join(Self::DATABASE_FILE)
    }

    /// Root of the durable disk.
    pub fn storage(&self) -> PathBuf {
        self.data_dir.join(Self::STORAGE_DIR)
    }

    /// Root of the scratch disk.
    pub fn scratch(&self) -> PathBuf {
        self.data_dir.join(Self::SCRATCH_DIR)
    }
}
