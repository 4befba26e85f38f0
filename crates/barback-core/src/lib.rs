//! Barback Core - Bulk migration and image pipeline for a cocktail recipe backend.
//!
//! This crate restores a full dataset from a migration archive, imports
//! recipes produced by an external scraper, and stores uploaded images with a
//! compact placeholder hash. It has no HTTP layer; the `barback` binary in
//! `barback-cli` drives it from the command line.
//!
//! # Example
//!
//! ```rust,ignore
//! use barback_core::{ArchiveMigrator, LocalDisk, SqliteStore};
//! use std::sync::Arc;
//!
//! fn main() -> barback_core::Result<()> {
//!     let store = Arc::new(SqliteStore::open("barback.db")?);
//!     let migrator = ArchiveMigrator::new(
//!         store,
//!         Arc::new(LocalDisk::new("storage")),
//!         Arc::new(LocalDisk::new("scratch")),
//!     );
//!
//!     let report = migrator.import_archive("backup.zip".as_ref())?;
//!     println!("Inserted {} rows", report.rows_inserted());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod images;
pub mod models;
pub mod placeholder;
pub mod scraper;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use archive::{ArchiveMigrator, ArchiveTable, MigrationFailure, MigrationReport};
pub use cancel::CancellationToken;
pub use catalog::CatalogResolver;
pub use config::BarbackPaths;
pub use error::{BarbackError, Result};
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use images::{ImageIngestor, ImageUpload, IngestReport, SourceImage};
pub use placeholder::{derive_placeholder, derive_placeholder_consuming};
pub use scraper::{ScrapedImportOutcome, ScrapedRecipe, ScrapedRecipeImporter};
pub use storage::{LocalDisk, Storage};
pub use store::{CatalogStore, ImageStore, RecipeStore, SqliteStore, TableStore};
