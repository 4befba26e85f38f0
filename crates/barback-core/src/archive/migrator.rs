//! Bulk restore of the full dataset from a zip archive.
//!
//! The archive carries one JSON row dump per table plus the image assets
//! under `uploads/`. Everything is replaced: tables are truncated children
//! first, then reloaded parents first, then the asset files are copied into
//! durable storage. A single bad row, table or file is recorded in the
//! [`MigrationReport`] and never aborts the run.

use super::report::{MigrationFailure, MigrationReport};
use super::ArchiveTable;
use crate::cancel::CancellationToken;
use crate::config::StorageConfig;
use crate::error::{BarbackError, Result};
use crate::storage::Storage;
use crate::store::TableStore;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Asset directories inside the archive and their destination on durable
/// storage.
const ASSET_DIRECTORIES: [(&str, &str); 2] = [
    (
        StorageConfig::ARCHIVE_COCKTAIL_ASSETS,
        StorageConfig::COCKTAIL_IMAGES_DIR,
    ),
    (
        StorageConfig::ARCHIVE_INGREDIENT_ASSETS,
        StorageConfig::INGREDIENT_IMAGES_DIR,
    ),
];

/// Restores tables and image assets from a migration archive.
pub struct ArchiveMigrator {
    tables: Arc<dyn TableStore>,
    durable: Arc<dyn Storage>,
    scratch: Arc<dyn Storage>,
    cancel: CancellationToken,
}

impl ArchiveMigrator {
    /// # Arguments
    ///
    /// * `tables` - Destination tables
    /// * `durable` - Storage receiving the image assets
    /// * `scratch` - Storage used for the extraction directory
    pub fn new(
        tables: Arc<dyn TableStore>,
        durable: Arc<dyn Storage>,
        scratch: Arc<dyn Storage>,
    ) -> Self {
        Self {
            tables,
            durable,
            scratch,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next archive entry, row or file boundary once `token` is
    /// cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the dataset with the contents of `archive_path`.
    ///
    /// Returns `Err(ArchiveOpen)` without touching any table when the file is
    /// not a readable zip archive. Any later failure is contained and listed
    /// in the returned report.
    pub fn import_archive(&self, archive_path: &Path) -> Result<MigrationReport> {
        let started = Instant::now();
        let mut report = MigrationReport::new(archive_path.to_path_buf());
        info!(archive = %archive_path.display(), "Starting archive import");

        let mut archive = open_archive(archive_path)?;

        let relative = format!(
            "{}{}",
            StorageConfig::EXTRACTION_PREFIX,
            Uuid::new_v4().simple()
        );
        let extract_dir = self.scratch.path(&relative)?;
        fs::create_dir_all(&extract_dir)
            .map_err(|e| BarbackError::io_with_path(e, &extract_dir))?;
        let _scratch = ScratchDirectory {
            storage: self.scratch.as_ref(),
            relative,
        };

        self.extract(&mut archive, &extract_dir, &mut report);

        if report.cancelled || self.cancel.is_cancelled() {
            warn!("Archive import cancelled before any table was changed");
            report.cancelled = true;
        } else {
            self.truncate_tables(&mut report);
            if self.load_tables(&extract_dir, &mut report) {
                self.copy_assets(&extract_dir, &mut report);
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            archive = %archive_path.display(),
            rows_inserted = report.rows_inserted(),
            rows_skipped = report.rows_skipped(),
            files_copied = report.files_copied,
            files_failed = report.files_failed,
            cancelled = report.cancelled,
            elapsed_secs = report.elapsed().as_secs_f64(),
            "Finished archive import"
        );

        Ok(report)
    }

    fn extract(
        &self,
        archive: &mut zip::ZipArchive<File>,
        extract_dir: &Path,
        report: &mut MigrationReport,
    ) {
        for index in 0..archive.len() {
            if self.cancel.is_cancelled() {
                warn!(extracted = index, "Archive import cancelled during extraction");
                report.cancelled = true;
                return;
            }

            let mut file = match archive.by_index(index) {
                Ok(file) => file,
                Err(e) => {
                    warn!(index, "Unreadable archive entry: {}", e);
                    report.failures.push(MigrationFailure::Extract {
                        entry: format!("#{}", index),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let outpath = match file.enclosed_name() {
                Some(path) => extract_dir.join(path),
                None => {
                    warn!(entry = file.name(), "Skipping entry outside extraction root");
                    continue;
                }
            };

            let written = if file.is_dir() {
                fs::create_dir_all(&outpath)
            } else {
                outpath
                    .parent()
                    .map_or(Ok(()), fs::create_dir_all)
                    .and_then(|()| File::create(&outpath))
                    .and_then(|mut outfile| std::io::copy(&mut file, &mut outfile))
                    .map(|_| ())
            };

            if let Err(e) = written {
                warn!(entry = file.name(), "Failed to extract: {}", e);
                report.failures.push(MigrationFailure::Extract {
                    entry: file.name().to_string(),
                    message: e.to_string(),
                });
            }
        }

        debug!(entries = archive.len(), dir = %extract_dir.display(), "Extracted archive");
    }

    fn truncate_tables(&self, report: &mut MigrationReport) {
        for table in ArchiveTable::truncate_order() {
            match self.tables.truncate(table) {
                Ok(()) => {
                    report.table_mut(table).truncated = true;
                    report.tables_truncated += 1;
                }
                Err(e) => {
                    error!("{}", e);
                    report.failures.push(MigrationFailure::Truncate {
                        table,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Load every dump in dependency order. Returns `false` if cancelled.
    fn load_tables(&self, extract_dir: &Path, report: &mut MigrationReport) -> bool {
        for table in ArchiveTable::DEPENDENCY_ORDER {
            let rows = match read_dump(&extract_dir.join(table.dump_file())) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(%table, "Skipping table: {}", e);
                    report.failures.push(MigrationFailure::DumpUnreadable {
                        table,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            for row in rows {
                if self.cancel.is_cancelled() {
                    warn!(%table, "Archive import cancelled during row load");
                    report.cancelled = true;
                    return false;
                }

                let Value::Object(row) = row else {
                    warn!(%table, "Skipping row that is not a JSON object");
                    report.table_mut(table).skipped += 1;
                    continue;
                };

                match self.tables.insert_row(table, &row) {
                    Ok(()) => report.table_mut(table).inserted += 1,
                    Err(e) => {
                        let row_id = row_identity(&row);
                        let message = e.to_string();
                        error!(
                            "{}",
                            BarbackError::RowInsert {
                                table: table.to_string(),
                                row_id: row_id.clone(),
                                message: message.clone(),
                            }
                        );
                        report.table_mut(table).skipped += 1;
                        report.failures.push(MigrationFailure::Row {
                            table,
                            row_id,
                            message,
                        });
                    }
                }
            }

            debug!(
                %table,
                inserted = report.inserted(table),
                skipped = report.skipped(table),
                "Loaded table"
            );
        }
        true
    }

    fn copy_assets(&self, extract_dir: &Path, report: &mut MigrationReport) {
        for (source, destination) in ASSET_DIRECTORIES {
            let source_dir = extract_dir.join(source);
            if !source_dir.is_dir() {
                debug!(dir = source, "No assets in archive");
                continue;
            }

            for entry in WalkDir::new(&source_dir).min_depth(1).max_depth(1) {
                if self.cancel.is_cancelled() {
                    warn!("Archive import cancelled during asset copy");
                    report.cancelled = true;
                    return;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        report.files_failed += 1;
                        report.failures.push(MigrationFailure::FileCopy {
                            path: e
                                .path()
                                .map_or_else(|| source_dir.clone(), Path::to_path_buf),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let target = format!(
                    "{}/{}",
                    destination,
                    entry.file_name().to_string_lossy()
                );
                match self.durable.copy(entry.path(), &target) {
                    Ok(()) => report.files_copied += 1,
                    Err(e) => {
                        error!("{}", e);
                        report.files_failed += 1;
                        report.failures.push(MigrationFailure::FileCopy {
                            path: entry.path().to_path_buf(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path).map_err(|e| BarbackError::ArchiveOpen {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    zip::ZipArchive::new(file).map_err(|e| BarbackError::ArchiveOpen {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_dump(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).map_err(|e| BarbackError::io_with_path(e, path))?;
    match serde_json::from_str(&content)? {
        Value::Array(rows) => Ok(rows),
        _ => Err(BarbackError::validation(
            path.display().to_string(),
            "row dump must be a JSON array",
        )),
    }
}

/// Identity of a row for failure messages.
fn row_identity(row: &Map<String, Value>) -> String {
    match row.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => "<none>".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Extraction directory removed when the run ends, whatever the outcome.
struct ScratchDirectory<'a> {
    storage: &'a dyn Storage,
    relative: String,
}

impl Drop for ScratchDirectory<'_> {
    fn drop(&mut self) {
        match self.storage.delete_directory(&self.relative) {
            Ok(()) => debug!(dir = %self.relative, "Removed extraction directory"),
            Err(e) => error!(dir = %self.relative, "Failed to remove extraction directory: {}", e),
        }
    }
}
