//! End-to-end: restore a catalog from an archive, then import a scrape
//! against it.

use barback_core::models::CatalogKind;
use barback_core::{
    ArchiveMigrator, BarbackError, CatalogStore, ImageFetcher, ImageIngestor, ImageStore,
    LocalDisk, RecipeStore, ScrapedRecipe, ScrapedRecipeImporter, SqliteStore, Storage,
};
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::fs::File;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Fetcher for tests that never touch the network.
struct OfflineFetcher;

impl ImageFetcher for OfflineFetcher {
    fn fetch(&self, url: &str) -> barback_core::Result<Vec<u8>> {
        Err(BarbackError::Network {
            message: format!("offline: {}", url),
        })
    }
}

fn png_data_uri() -> String {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, 120])
    }));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
    )
}

fn restore_catalog(temp: &TempDir, store: Arc<SqliteStore>, durable: Arc<LocalDisk>) {
    let path = temp.path().join("backup.zip");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, rows) in [
        ("glasses.json", json!([{"id": 1, "name": "Rocks"}])),
        (
            "ingredients.json",
            json!([{"id": 1, "name": "Bourbon"}, {"id": 2, "name": "Angostura Bitters"}]),
        ),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(&serde_json::to_vec(&rows).unwrap()).unwrap();
    }
    zip.finish().unwrap();

    let scratch = Arc::new(LocalDisk::new(temp.path().join("scratch")));
    ArchiveMigrator::new(store, durable, scratch)
        .import_archive(&path)
        .unwrap();
}

#[test]
fn test_scrape_reuses_restored_catalog_and_stores_image() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp.path().join("barback.db")).unwrap());
    let durable = Arc::new(LocalDisk::new(temp.path().join("storage")));
    restore_catalog(&temp, store.clone(), durable.clone());

    let ingestor = Arc::new(ImageIngestor::new(durable.clone(), store.clone()));
    let importer = ScrapedRecipeImporter::new(
        store.clone(),
        store.clone(),
        ingestor,
        Arc::new(OfflineFetcher),
    );

    let payload: ScrapedRecipe = serde_json::from_value(json!({
        "name": "Old Fashioned",
        "instructions": "Stir with ice, strain over a large cube.",
        "source": "https://example.com/old-fashioned",
        "glass": "rocks",
        "image": {"data": png_data_uri(), "copyright": "Photo: Example"},
        "ingredients": [
            {"name": "bourbon", "amount": 60, "units": "ml"},
            {"name": "demerara syrup", "amount": 7.5, "units": "ml"},
            {"name": "ANGOSTURA BITTERS", "amount": 2, "units": "dashes"}
        ],
        "tags": ["Classic", "stirred"]
    }))
    .unwrap();

    let outcome = importer.import_scraped(&payload).unwrap();

    assert_eq!(outcome.glass_id, Some(1));
    assert!(outcome.created_glasses.is_empty());
    assert_eq!(outcome.created_ingredients.len(), 1);
    assert_eq!(outcome.created_ingredients[0].name, "Demerara syrup");
    assert!(outcome.warnings.is_empty());

    let recipe = store.find_recipe(outcome.recipe_id).unwrap().unwrap();
    let ids: Vec<_> = recipe.ingredients.iter().map(|l| l.ingredient_id).collect();
    assert_eq!(ids[0], 1);
    assert_eq!(ids[2], 2);
    let sorts: Vec<_> = recipe.ingredients.iter().map(|l| l.sort).collect();
    assert_eq!(sorts, vec![1, 2, 3]);

    assert_eq!(recipe.image_ids.len(), 1);
    let image = store.find_image(recipe.image_ids[0]).unwrap().unwrap();
    assert_eq!(image.copyright.as_deref(), Some("Photo: Example"));
    assert!(image.placeholder_hash.is_some());
    assert!(durable.exists(&image.file_path).unwrap());

    assert_eq!(store.catalog_snapshot(CatalogKind::Ingredient).unwrap().len(), 3);
}

#[test]
fn test_unreachable_image_url_is_a_warning() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let durable = Arc::new(LocalDisk::new(temp.path().join("storage")));
    let importer = ScrapedRecipeImporter::new(
        store.clone(),
        store.clone(),
        Arc::new(ImageIngestor::new(durable, store.clone())),
        Arc::new(OfflineFetcher),
    );

    let payload: ScrapedRecipe = serde_json::from_value(json!({
        "name": "gimlet",
        "instructions": "Shake",
        "image": {"url": "https://example.com/gimlet.jpg"},
        "ingredients": [{"name": "gin", "amount": 60, "units": "ml"}]
    }))
    .unwrap();

    let outcome = importer.import_scraped(&payload).unwrap();

    assert!(outcome.image_ids.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(store.find_recipe(outcome.recipe_id).unwrap().is_some());
}
