//! Persistence collaborators.
//!
//! The import flows depend on the traits only; [`SqliteStore`] is the bundled
//! implementation backing every table of the migration archive.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CatalogStore, ImageStore, RecipeStore, TableStore};
