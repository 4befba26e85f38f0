//! Domain records shared by the import flows and the persistence layer.

use serde::{Deserialize, Serialize};

pub type RecipeId = i64;
pub type ImageId = i64;
pub type CatalogId = i64;

/// Kind of reusable catalog entry a recipe can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Ingredient,
    Glass,
}

impl CatalogKind {
    /// Table holding entries of this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            CatalogKind::Ingredient => "ingredients",
            CatalogKind::Glass => "glasses",
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogKind::Ingredient => write!(f, "ingredient"),
            CatalogKind::Glass => write!(f, "glass"),
        }
    }
}

/// An existing ingredient or glass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub kind: CatalogKind,
    pub scope_id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl CatalogEntry {
    /// Lower-cased, trimmed name used to match free text against this entry.
    pub fn match_key(&self) -> String {
        match_key(&self.name)
    }
}

/// Normalize a free-text name into a catalog matching key.
pub fn match_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct NewCatalogEntry {
    pub scope_id: i64,
    pub name: String,
    pub description: String,
}

/// Persisted image metadata. The binary lives in durable storage at `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredImage {
    pub id: ImageId,
    pub owner_id: i64,
    pub file_path: String,
    pub file_extension: String,
    pub sort: i64,
    pub copyright: Option<String>,
    pub placeholder_hash: Option<String>,
    pub imageable_type: Option<String>,
    pub imageable_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub owner_id: i64,
    pub file_path: String,
    pub file_extension: String,
    pub sort: i64,
    pub copyright: Option<String>,
    pub placeholder_hash: String,
}

/// Fields of an existing image that may change after upload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageMetadataUpdate {
    pub copyright: Option<String>,
    pub sort: Option<i64>,
}

/// One resolved ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredientLine {
    pub ingredient_id: CatalogId,
    /// Name as it appeared in the source, kept for display.
    pub name: String,
    pub amount: f64,
    pub units: String,
    /// 1-based position, sequential without gaps.
    pub sort: u32,
    pub optional: bool,
    pub substitutes: Vec<CatalogId>,
}

/// A recipe aggregate ready to be persisted in one unit.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub owner_id: i64,
    pub name: String,
    pub instructions: String,
    pub description: Option<String>,
    pub garnish: Option<String>,
    pub source: Option<String>,
    pub glass_id: Option<CatalogId>,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub image_ids: Vec<ImageId>,
    pub tags: Vec<String>,
}

/// A persisted recipe as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub owner_id: i64,
    pub name: String,
    pub instructions: String,
    pub description: Option<String>,
    pub garnish: Option<String>,
    pub source: Option<String>,
    pub glass_id: Option<CatalogId>,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub image_ids: Vec<ImageId>,
    pub tags: Vec<String>,
}
