//! Archive-based bulk migration.

mod migrator;
mod report;
mod table;

pub use migrator::ArchiveMigrator;
pub use report::{MigrationFailure, MigrationReport, TableReport};
pub use table::ArchiveTable;
