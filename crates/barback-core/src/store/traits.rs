//! Persistence collaborator traits.
//!
//! The import flows only talk to these traits. All operations are synchronous
//! to match rusqlite's API.

use crate::archive::ArchiveTable;
use crate::error::Result;
use crate::models::{
    CatalogEntry, CatalogId, CatalogKind, ImageId, ImageMetadataUpdate, NewCatalogEntry,
    NewImage, NewRecipe, Recipe, RecipeId, StoredImage,
};
use serde_json::{Map, Value};

/// Row-level access used by the archive migrator.
pub trait TableStore: Send + Sync {
    /// Remove every row of a table.
    fn truncate(&self, table: ArchiveTable) -> Result<()>;

    /// Insert one row whose keys are column names.
    fn insert_row(&self, table: ArchiveTable, row: &Map<String, Value>) -> Result<()>;

    fn count_rows(&self, table: ArchiveTable) -> Result<usize>;
}

/// Ingredient and glass catalog access.
pub trait CatalogStore: Send + Sync {
    /// Every entry of one kind, across all scopes.
    fn catalog_snapshot(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>>;

    fn insert_catalog_entry(&self, kind: CatalogKind, entry: &NewCatalogEntry)
        -> Result<CatalogId>;
}

/// Image metadata records.
pub trait ImageStore: Send + Sync {
    fn insert_image(&self, image: &NewImage) -> Result<StoredImage>;

    fn find_image(&self, id: ImageId) -> Result<Option<StoredImage>>;

    /// Apply a metadata update. Returns `None` if the image does not exist.
    fn update_image_metadata(
        &self,
        id: ImageId,
        update: &ImageMetadataUpdate,
    ) -> Result<Option<StoredImage>>;
}

/// Recipe aggregate persistence.
pub trait RecipeStore: Send + Sync {
    /// Persist a recipe with its lines, tags and image attachments as one unit.
    fn create_recipe(&self, recipe: &NewRecipe) -> Result<RecipeId>;

    fn find_recipe(&self, id: RecipeId) -> Result<Option<Recipe>>;
}
