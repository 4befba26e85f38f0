//! Turning scraped recipe payloads into persisted recipe aggregates.
//!
//! Secondary attributes (image, glass, a single ingredient or substitute) are
//! best effort: a failure is logged, recorded as a warning and skipped. Only
//! the final aggregate persistence call can fail the import.

use crate::catalog::CatalogResolver;
use crate::config::ImportConfig;
use crate::error::{BarbackError, Result};
use crate::fetch::ImageFetcher;
use crate::images::{ImageIngestor, ImageUpload, SourceImage};
use crate::models::{
    CatalogEntry, CatalogId, CatalogKind, ImageId, NewRecipe, RecipeId, RecipeIngredientLine,
};
use crate::store::{CatalogStore, RecipeStore};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A recipe harvested from an external source.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedRecipe {
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub garnish: Option<String>,
    /// Source URL or attribution.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub image: Option<ScrapedImage>,
    #[serde(default)]
    pub glass: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<ScrapedIngredient>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Image reference in a scrape: a remote URL or inline base64 data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapedImage {
    #[serde(default)]
    pub url: Option<String>,
    /// Base64 payload, optionally as a `data:` URI.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedIngredient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub substitutes: Vec<String>,
}

/// Result of a successful scraped import.
#[derive(Debug, Serialize)]
pub struct ScrapedImportOutcome {
    pub recipe_id: RecipeId,
    pub glass_id: Option<CatalogId>,
    pub image_ids: Vec<ImageId>,
    pub created_ingredients: Vec<CatalogEntry>,
    pub created_glasses: Vec<CatalogEntry>,
    /// Secondary attributes that were dropped, with reasons.
    pub warnings: Vec<String>,
}

/// Normalizes scrape payloads into recipes.
pub struct ScrapedRecipeImporter {
    catalog: Arc<dyn CatalogStore>,
    recipes: Arc<dyn RecipeStore>,
    ingestor: Arc<ImageIngestor>,
    fetcher: Arc<dyn ImageFetcher>,
    owner_id: i64,
    scope_id: i64,
}

impl ScrapedRecipeImporter {
    /// # Arguments
    ///
    /// * `catalog` - Ingredient and glass catalogs
    /// * `recipes` - Receives the assembled recipe aggregate
    /// * `ingestor` - Stores the scraped image
    /// * `fetcher` - Retrieves images referenced by URL
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        recipes: Arc<dyn RecipeStore>,
        ingestor: Arc<ImageIngestor>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            catalog,
            recipes,
            ingestor,
            fetcher,
            owner_id: ImportConfig::DEFAULT_OWNER_ID,
            scope_id: ImportConfig::DEFAULT_SCOPE_ID,
        }
    }

    /// Set the recipe owner and the catalog scope names are resolved in.
    pub fn with_owner(mut self, owner_id: i64, scope_id: i64) -> Self {
        self.owner_id = owner_id;
        self.scope_id = scope_id;
        self
    }

    /// Create a recipe from a scrape payload.
    pub fn import_scraped(&self, payload: &ScrapedRecipe) -> Result<ScrapedImportOutcome> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(BarbackError::validation("name", "recipe name must not be empty"));
        }

        let provenance = format!(
            "{}{}",
            ImportConfig::PROVENANCE_PREFIX,
            payload.source.as_deref().unwrap_or("unknown source")
        );
        let mut warnings = Vec::new();

        // Image
        let mut image_ids = Vec::new();
        if let Some(image) = &payload.image {
            match self.load_image(image) {
                Ok(Some(file)) => {
                    let report = self.ingestor.ingest(
                        vec![ImageUpload {
                            file: Some(file),
                            copyright: image.copyright.clone(),
                            sort: 1,
                        }],
                        self.owner_id,
                    );
                    image_ids.extend(report.stored.iter().map(|stored| stored.id));
                    warnings.extend(
                        report
                            .failures
                            .into_iter()
                            .map(|failure| format!("image: {}", failure.reason)),
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Unable to load scraped image: {}", e);
                    warnings.push(format!("image: {}", e));
                }
            }
        }

        // Glass
        let mut glasses = CatalogResolver::seeded(&*self.catalog, CatalogKind::Glass)?;
        let glass_id = match payload.glass.as_deref().map(str::trim) {
            Some(glass) if !glass.is_empty() => {
                match glasses.resolve(glass, self.scope_id, &provenance) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(glass, "Unable to resolve glass: {}", e);
                        warnings.push(format!("glass '{}': {}", glass, e));
                        None
                    }
                }
            }
            _ => None,
        };

        // Ingredients, numbered in input order
        let mut ingredients = CatalogResolver::seeded(&*self.catalog, CatalogKind::Ingredient)?;
        let mut lines = Vec::with_capacity(payload.ingredients.len());
        let mut sort = 1u32;
        for mention in &payload.ingredients {
            let ingredient_id = match ingredients.resolve(&mention.name, self.scope_id, &provenance)
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(ingredient = %mention.name, "Unable to resolve ingredient: {}", e);
                    warnings.push(format!("ingredient '{}': {}", mention.name, e));
                    continue;
                }
            };

            let mut substitutes = Vec::with_capacity(mention.substitutes.len());
            for substitute in &mention.substitutes {
                match ingredients.resolve(substitute, self.scope_id, &provenance) {
                    Ok(id) => substitutes.push(id),
                    Err(e) => {
                        warn!(substitute = %substitute, "Unable to resolve substitute: {}", e);
                        warnings.push(format!("substitute '{}': {}", substitute, e));
                    }
                }
            }

            lines.push(RecipeIngredientLine {
                ingredient_id,
                name: mention.name.trim().to_string(),
                amount: mention.amount,
                units: mention.units.clone(),
                sort,
                optional: mention.optional,
                substitutes,
            });
            sort += 1;
        }

        let recipe = NewRecipe {
            owner_id: self.owner_id,
            name: name.to_string(),
            instructions: payload.instructions.clone(),
            description: payload.description.clone(),
            garnish: payload.garnish.clone(),
            source: payload.source.clone(),
            glass_id,
            ingredients: lines,
            image_ids: image_ids.clone(),
            tags: payload.tags.clone(),
        };
        let recipe_id = self.recipes.create_recipe(&recipe)?;

        info!(
            recipe_id,
            recipe = name,
            ingredients = recipe.ingredients.len(),
            warnings = warnings.len(),
            "Imported scraped recipe"
        );

        Ok(ScrapedImportOutcome {
            recipe_id,
            glass_id,
            image_ids,
            created_ingredients: ingredients.created().to_vec(),
            created_glasses: glasses.created().to_vec(),
            warnings,
        })
    }

    /// Decode the referenced image, preferring inline data over a URL.
    fn load_image(&self, image: &ScrapedImage) -> Result<Option<SourceImage>> {
        let bytes = if let Some(data) = image.data.as_deref().filter(|d| !d.trim().is_empty()) {
            decode_inline(data)?
        } else if let Some(url) = image.url.as_deref().filter(|u| !u.trim().is_empty()) {
            self.fetcher.fetch(url.trim())?
        } else {
            return Ok(None);
        };

        SourceImage::decode(&bytes).map(Some)
    }
}

fn decode_inline(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    let encoded = match data.strip_prefix("data:") {
        Some(uri) => uri.split_once(',').map(|(_, payload)| payload).unwrap_or(""),
        None => data,
    };
    STANDARD
        .decode(encoded)
        .map_err(|e| BarbackError::validation("image.data", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCatalogEntry, Recipe};
    use crate::storage::LocalDisk;
    use crate::store::SqliteStore;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use tempfile::TempDir;

    /// Fetcher that serves fixed bytes, or fails when empty.
    struct StaticFetcher(Vec<u8>);

    impl ImageFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            if self.0.is_empty() {
                Err(BarbackError::Network {
                    message: format!("404 for {}", url),
                })
            } else {
                Ok(self.0.clone())
            }
        }
    }

    /// Recipe store that refuses every write.
    struct BrokenRecipes;

    impl RecipeStore for BrokenRecipes {
        fn create_recipe(&self, _recipe: &NewRecipe) -> Result<RecipeId> {
            Err(BarbackError::Database {
                message: "disk I/O error".into(),
                source: None,
            })
        }

        fn find_recipe(&self, _id: RecipeId) -> Result<Option<Recipe>> {
            Ok(None)
        }
    }

    fn png_bytes() -> Vec<u8> {
        SourceImage::new(
            DynamicImage::ImageRgb8(RgbImage::from_fn(60, 40, |x, y| Rgb([x as u8, y as u8, 0]))),
            Some(ImageFormat::Png),
        )
        .encode()
        .unwrap()
    }

    fn setup(fetched: Vec<u8>) -> (TempDir, Arc<SqliteStore>, ScrapedRecipeImporter) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let ingestor = Arc::new(ImageIngestor::new(
            Arc::new(LocalDisk::new(temp.path())),
            store.clone(),
        ));
        let importer = ScrapedRecipeImporter::new(
            store.clone(),
            store.clone(),
            ingestor,
            Arc::new(StaticFetcher(fetched)),
        );
        (temp, store, importer)
    }

    fn seed_ingredient(store: &SqliteStore, name: &str) -> CatalogId {
        store
            .insert_catalog_entry(
                CatalogKind::Ingredient,
                &NewCatalogEntry {
                    scope_id: 1,
                    name: name.into(),
                    description: String::new(),
                },
            )
            .unwrap()
    }

    fn payload(value: serde_json::Value) -> ScrapedRecipe {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_lines_are_numbered_and_unknown_names_created_once() {
        let (_temp, store, importer) = setup(vec![]);
        let gin = seed_ingredient(&store, "Gin");
        let lime = seed_ingredient(&store, "Lime Juice");

        let outcome = importer
            .import_scraped(&payload(json!({
                "name": "Gimlet",
                "instructions": "Shake and strain",
                "source": "https://example.com/gimlet",
                "ingredients": [
                    {"name": "gin", "amount": 60, "units": "ml"},
                    {"name": "Rose's lime cordial", "amount": 15, "units": "ml"},
                    {"name": "lime juice", "amount": 7.5, "units": "ml", "optional": true}
                ]
            })))
            .unwrap();

        assert_eq!(outcome.created_ingredients.len(), 1);
        assert_eq!(
            outcome.created_ingredients[0].description.as_deref(),
            Some("Created by scraper from https://example.com/gimlet")
        );

        let recipe = store.find_recipe(outcome.recipe_id).unwrap().unwrap();
        let sorts: Vec<u32> = recipe.ingredients.iter().map(|l| l.sort).collect();
        assert_eq!(sorts, vec![1, 2, 3]);
        assert_eq!(recipe.ingredients[0].ingredient_id, gin);
        assert_eq!(
            recipe.ingredients[1].ingredient_id,
            outcome.created_ingredients[0].id
        );
        assert_eq!(recipe.ingredients[2].ingredient_id, lime);
        assert!(recipe.ingredients[2].optional);
    }

    #[test]
    fn test_glass_and_substitutes_are_resolved() {
        let (_temp, store, importer) = setup(vec![]);

        let outcome = importer
            .import_scraped(&payload(json!({
                "name": "Old Fashioned",
                "instructions": "Stir",
                "glass": "rocks glass",
                "ingredients": [
                    {"name": "Bourbon", "amount": 60, "units": "ml", "substitutes": ["Rye whiskey"]},
                    {"name": "rye whiskey", "amount": 0, "units": ""}
                ],
                "tags": ["Classic", "Stirred"]
            })))
            .unwrap();

        assert_eq!(outcome.created_glasses.len(), 1);
        assert_eq!(outcome.created_glasses[0].name, "Rocks glass");
        // Bourbon + Rye whiskey; the second mention reuses the substitute entry.
        assert_eq!(outcome.created_ingredients.len(), 2);

        let recipe = store.find_recipe(outcome.recipe_id).unwrap().unwrap();
        assert_eq!(recipe.glass_id, outcome.glass_id);
        assert_eq!(
            recipe.ingredients[0].substitutes,
            vec![recipe.ingredients[1].ingredient_id]
        );
        assert_eq!(recipe.tags.len(), 2);
    }

    #[test]
    fn test_image_failure_does_not_block_recipe() {
        let (_temp, store, importer) = setup(vec![]);

        let outcome = importer
            .import_scraped(&payload(json!({
                "name": "Daiquiri",
                "instructions": "Shake",
                "image": {"url": "https://example.com/missing.jpg", "copyright": "Example"}
            })))
            .unwrap();

        assert!(outcome.image_ids.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(store.find_recipe(outcome.recipe_id).unwrap().is_some());
    }

    #[test]
    fn test_fetched_image_is_attached() {
        let (_temp, store, importer) = setup(png_bytes());

        let outcome = importer
            .import_scraped(&payload(json!({
                "name": "Mojito",
                "instructions": "Muddle",
                "image": {"url": "https://example.com/mojito.png", "copyright": "Example"}
            })))
            .unwrap();

        assert_eq!(outcome.image_ids.len(), 1);
        let recipe = store.find_recipe(outcome.recipe_id).unwrap().unwrap();
        assert_eq!(recipe.image_ids, outcome.image_ids);
    }

    #[test]
    fn test_inline_data_uri_image() {
        let (_temp, _store, importer) = setup(vec![]);
        let data = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes()));

        let outcome = importer
            .import_scraped(&payload(json!({
                "name": "Paloma",
                "instructions": "Build",
                "image": {"data": data}
            })))
            .unwrap();

        assert_eq!(outcome.image_ids.len(), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_persistence_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let ingestor = Arc::new(ImageIngestor::new(
            Arc::new(LocalDisk::new(temp.path())),
            store.clone(),
        ));
        let importer = ScrapedRecipeImporter::new(
            store,
            Arc::new(BrokenRecipes),
            ingestor,
            Arc::new(StaticFetcher(vec![])),
        );

        let result = importer.import_scraped(&payload(json!({
            "name": "Sazerac",
            "instructions": "Stir"
        })));
        assert!(matches!(result, Err(BarbackError::Database { .. })));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let (_temp, _store, importer) = setup(vec![]);
        let result = importer.import_scraped(&payload(json!({"name": "  "})));
        assert!(matches!(result, Err(BarbackError::Validation { .. })));
    }
}
