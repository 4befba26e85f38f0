//! Operator-facing outcome of an archive migration.

use super::ArchiveTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Per-table counters.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: ArchiveTable,
    pub truncated: bool,
    pub inserted: usize,
    pub skipped: usize,
}

/// A contained failure. None of these abort the run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationFailure {
    Extract {
        entry: String,
        message: String,
    },
    Truncate {
        table: ArchiveTable,
        message: String,
    },
    /// The row dump was missing or unreadable; the table stays truncated.
    DumpUnreadable {
        table: ArchiveTable,
        message: String,
    },
    Row {
        table: ArchiveTable,
        row_id: String,
        message: String,
    },
    FileCopy {
        path: PathBuf,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub archive: PathBuf,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub tables_truncated: usize,
    /// One entry per table, in dependency order.
    pub tables: Vec<TableReport>,
    pub files_copied: usize,
    pub files_failed: usize,
    pub failures: Vec<MigrationFailure>,
    /// The run stopped early at an entry, row or file boundary.
    pub cancelled: bool,
}

impl MigrationReport {
    pub(crate) fn new(archive: PathBuf) -> Self {
        Self {
            archive,
            started_at: Utc::now(),
            elapsed_ms: 0,
            tables_truncated: 0,
            tables: ArchiveTable::DEPENDENCY_ORDER
                .iter()
                .map(|table| TableReport {
                    table: *table,
                    truncated: false,
                    inserted: 0,
                    skipped: 0,
                })
                .collect(),
            files_copied: 0,
            files_failed: 0,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    /// Counters for one table.
    pub fn table(&self, table: ArchiveTable) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub(crate) fn table_mut(&mut self, table: ArchiveTable) -> &mut TableReport {
        let index = ArchiveTable::DEPENDENCY_ORDER
            .iter()
            .position(|t| *t == table)
            .unwrap_or_default();
        &mut self.tables[index]
    }

    /// Rows inserted into `table`.
    pub fn inserted(&self, table: ArchiveTable) -> usize {
        self.table(table).map_or(0, |t| t.inserted)
    }

    /// Rows of `table` that failed or were not objects.
    pub fn skipped(&self, table: ArchiveTable) -> usize {
        self.table(table).map_or(0, |t| t.skipped)
    }

    /// Rows inserted across all tables.
    pub fn rows_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    /// Rows skipped across all tables.
    pub fn rows_skipped(&self) -> usize {
        self.tables.iter().map(|t| t.skipped).sum()
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Whether anything at all was skipped or failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}
