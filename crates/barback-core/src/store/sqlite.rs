//! SQLite-backed persistence for catalog, image, recipe and archive tables.

use super::traits::{CatalogStore, ImageStore, RecipeStore, TableStore};
use crate::archive::ArchiveTable;
use crate::error::{BarbackError, Result};
use crate::models::{
    match_key, CatalogEntry, CatalogId, CatalogKind, ImageId, ImageMetadataUpdate,
    NewCatalogEntry, NewImage, NewRecipe, Recipe, RecipeId, RecipeIngredientLine, StoredImage,
};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// `imageable_type` marker for images attached to a cocktail.
const COCKTAIL_IMAGEABLE: &str = "cocktail";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ingredient_categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS glasses (
    id INTEGER PRIMARY KEY,
    scope_id INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingredients (
    id INTEGER PRIMARY KEY,
    scope_id INTEGER NOT NULL DEFAULT 1,
    ingredient_category_id INTEGER REFERENCES ingredient_categories(id),
    name TEXT NOT NULL,
    description TEXT,
    strength REAL NOT NULL DEFAULT 0,
    color TEXT,
    origin TEXT,
    user_id INTEGER,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS cocktails (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    instructions TEXT NOT NULL,
    description TEXT,
    garnish TEXT,
    source TEXT,
    glass_id INTEGER REFERENCES glasses(id),
    user_id INTEGER NOT NULL DEFAULT 1,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS cocktail_ingredients (
    id INTEGER PRIMARY KEY,
    cocktail_id INTEGER NOT NULL REFERENCES cocktails(id),
    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
    name TEXT,
    amount REAL NOT NULL DEFAULT 0,
    units TEXT NOT NULL DEFAULT '',
    sort INTEGER NOT NULL DEFAULT 0,
    optional INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS cocktail_ingredient_substitutes (
    id INTEGER PRIMARY KEY,
    cocktail_ingredient_id INTEGER NOT NULL REFERENCES cocktail_ingredients(id),
    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id)
);

CREATE TABLE IF NOT EXISTS cocktail_tag (
    cocktail_id INTEGER NOT NULL REFERENCES cocktails(id),
    tag_id INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (cocktail_id, tag_id)
);

CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY,
    imageable_type TEXT,
    imageable_id INTEGER,
    user_id INTEGER NOT NULL DEFAULT 1,
    file_path TEXT NOT NULL UNIQUE,
    file_extension TEXT NOT NULL,
    sort INTEGER NOT NULL DEFAULT 0,
    copyright TEXT,
    placeholder_hash TEXT,
    created_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_cocktail_ingredients_cocktail
    ON cocktail_ingredients(cocktail_id, sort);
CREATE INDEX IF NOT EXISTS idx_images_imageable
    ON images(imageable_type, imageable_id);
"#;

const IMAGE_COLUMNS: &str = "id, user_id, file_path, file_extension, sort, copyright, \
     placeholder_hash, imageable_type, imageable_id";

/// SQLite store implementing every persistence trait.
///
/// Thread-safe via an internal mutex on the connection; foreign keys are
/// enforced so out-of-order inserts fail the offending row.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    /// Column names per table, read lazily from `PRAGMA table_info`.
    columns: Mutex<HashMap<ArchiveTable, HashSet<String>>>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BarbackError::Io {
                message: format!("Failed to create database directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| BarbackError::Database {
            message: format!("Failed to open database: {}", e),
            source: Some(e),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| BarbackError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| BarbackError::Database {
                message: format!("Failed to initialize schema: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            columns: Mutex::new(HashMap::new()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| BarbackError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn table_columns(&self, conn: &Connection, table: ArchiveTable) -> Result<HashSet<String>> {
        let mut cache = self.columns.lock().map_err(|e| BarbackError::Database {
            message: format!("Failed to lock column cache: {}", e),
            source: None,
        })?;

        if let Some(columns) = cache.get(&table) {
            return Ok(columns.clone());
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table.name()))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        cache.insert(table, columns.clone());

        Ok(columns)
    }

    fn load_image(conn: &Connection, id: ImageId) -> Result<Option<StoredImage>> {
        let image = conn
            .query_row(
                &format!("SELECT {} FROM images WHERE id = ?1", IMAGE_COLUMNS),
                params![id],
                image_from_row,
            )
            .optional()?;
        Ok(image)
    }
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<StoredImage> {
    Ok(StoredImage {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        file_path: row.get(2)?,
        file_extension: row.get(3)?,
        sort: row.get(4)?,
        copyright: row.get(5)?,
        placeholder_hash: row.get(6)?,
        imageable_type: row.get(7)?,
        imageable_id: row.get(8)?,
    })
}

/// Map a primitive JSON value to an SQLite value.
///
/// Nested arrays and objects are stored as their JSON text.
fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

impl TableStore for SqliteStore {
    fn truncate(&self, table: ArchiveTable) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(&format!("DELETE FROM {}", table.name()), [])
            .map_err(|e| BarbackError::TableTruncate {
                table: table.name().to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn insert_row(&self, table: ArchiveTable, row: &Map<String, Value>) -> Result<()> {
        let conn = self.lock()?;
        let known = self.table_columns(&conn, table)?;

        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in row {
            if known.contains(column) {
                columns.push(format!("\"{}\"", column));
                values.push(json_to_sql(value));
            } else {
                debug!(table = table.name(), column = %column, "Ignoring unknown column");
            }
        }

        if columns.is_empty() {
            return Err(BarbackError::validation(
                table.name(),
                "row has no known columns",
            ));
        }

        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders
        );

        conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn count_rows(&self, table: ArchiveTable) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl CatalogStore for SqliteStore {
    fn catalog_snapshot(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, scope_id, name, description FROM {} ORDER BY id",
            kind.table_name()
        ))?;

        let entries = stmt
            .query_map([], |row| {
                Ok(CatalogEntry {
                    id: row.get(0)?,
                    kind,
                    scope_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn insert_catalog_entry(
        &self,
        kind: CatalogKind,
        entry: &NewCatalogEntry,
    ) -> Result<CatalogId> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (scope_id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                kind.table_name()
            ),
            params![
                entry.scope_id,
                entry.name,
                entry.description,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl ImageStore for SqliteStore {
    fn insert_image(&self, image: &NewImage) -> Result<StoredImage> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO images (user_id, file_path, file_extension, sort, copyright, placeholder_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image.owner_id,
                image.file_path,
                image.file_extension,
                image.sort,
                image.copyright,
                image.placeholder_hash,
                Utc::now().to_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::load_image(&conn, id)?.ok_or(BarbackError::NotFound {
            entity: "Image",
            id,
        })
    }

    fn find_image(&self, id: ImageId) -> Result<Option<StoredImage>> {
        let conn = self.lock()?;
        Self::load_image(&conn, id)
    }

    fn update_image_metadata(
        &self,
        id: ImageId,
        update: &ImageMetadataUpdate,
    ) -> Result<Option<StoredImage>> {
        let conn = self.lock()?;
        let Some(mut image) = Self::load_image(&conn, id)? else {
            return Ok(None);
        };

        // Empty copyright and zero sort mean "leave as is".
        if let Some(copyright) = update.copyright.as_ref().filter(|c| !c.is_empty()) {
            image.copyright = Some(copyright.clone());
        }
        if let Some(sort) = update.sort.filter(|s| *s != 0) {
            image.sort = sort;
        }

        conn.execute(
            "UPDATE images SET copyright = ?1, sort = ?2 WHERE id = ?3",
            params![image.copyright, image.sort, id],
        )?;

        Ok(Some(image))
    }
}

impl RecipeStore for SqliteStore {
    fn create_recipe(&self, recipe: &NewRecipe) -> Result<RecipeId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO cocktails (name, instructions, description, garnish, source, glass_id, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                recipe.name,
                recipe.instructions,
                recipe.description,
                recipe.garnish,
                recipe.source,
                recipe.glass_id,
                recipe.owner_id,
                now
            ],
        )?;
        let recipe_id = tx.last_insert_rowid();

        for line in &recipe.ingredients {
            tx.execute(
                "INSERT INTO cocktail_ingredients (cocktail_id, ingredient_id, name, amount, units, sort, optional)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    recipe_id,
                    line.ingredient_id,
                    line.name,
                    line.amount,
                    line.units,
                    line.sort,
                    line.optional
                ],
            )?;
            let line_id = tx.last_insert_rowid();

            for substitute in &line.substitutes {
                tx.execute(
                    "INSERT INTO cocktail_ingredient_substitutes (cocktail_ingredient_id, ingredient_id)
                     VALUES (?1, ?2)",
                    params![line_id, substitute],
                )?;
            }
        }

        // Tags match on the same key as catalog entries; oldest row wins.
        let mut known_tags: HashMap<String, i64> = HashMap::new();
        {
            let mut stmt = tx.prepare("SELECT id, name FROM tags ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, name) = row?;
                known_tags.entry(match_key(&name)).or_insert(id);
            }
        }

        let mut seen_tags = HashSet::new();
        for tag in &recipe.tags {
            let tag = tag.trim();
            let key = match_key(tag);
            if tag.is_empty() || !seen_tags.insert(key.clone()) {
                continue;
            }

            let tag_id = match known_tags.get(&key) {
                Some(id) => *id,
                None => {
                    tx.execute("INSERT INTO tags (name) VALUES (?1)", params![tag])?;
                    let id = tx.last_insert_rowid();
                    known_tags.insert(key, id);
                    id
                }
            };

            tx.execute(
                "INSERT OR IGNORE INTO cocktail_tag (cocktail_id, tag_id) VALUES (?1, ?2)",
                params![recipe_id, tag_id],
            )?;
        }

        for image_id in &recipe.image_ids {
            let updated = tx.execute(
                "UPDATE images SET imageable_type = ?1, imageable_id = ?2 WHERE id = ?3",
                params![COCKTAIL_IMAGEABLE, recipe_id, image_id],
            )?;
            if updated == 0 {
                return Err(BarbackError::NotFound {
                    entity: "Image",
                    id: *image_id,
                });
            }
        }

        tx.commit()?;
        Ok(recipe_id)
    }

    fn find_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let conn = self.lock()?;

        let recipe = conn
            .query_row(
                "SELECT id, user_id, name, instructions, description, garnish, source, glass_id
                 FROM cocktails WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Recipe {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        name: row.get(2)?,
                        instructions: row.get(3)?,
                        description: row.get(4)?,
                        garnish: row.get(5)?,
                        source: row.get(6)?,
                        glass_id: row.get(7)?,
                        ingredients: Vec::new(),
                        image_ids: Vec::new(),
                        tags: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut recipe) = recipe else {
            return Ok(None);
        };

        let mut lines_stmt = conn.prepare(
            "SELECT id, ingredient_id, COALESCE(name, ''), amount, units, sort, optional
             FROM cocktail_ingredients WHERE cocktail_id = ?1 ORDER BY sort, id",
        )?;
        let lines = lines_stmt
            .query_map(params![id], |row| {
                let line_id: i64 = row.get(0)?;
                Ok((
                    line_id,
                    RecipeIngredientLine {
                        ingredient_id: row.get(1)?,
                        name: row.get(2)?,
                        amount: row.get(3)?,
                        units: row.get(4)?,
                        sort: row.get(5)?,
                        optional: row.get(6)?,
                        substitutes: Vec::new(),
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut substitutes_stmt = conn.prepare(
            "SELECT ingredient_id FROM cocktail_ingredient_substitutes
             WHERE cocktail_ingredient_id = ?1 ORDER BY id",
        )?;
        for (line_id, mut line) in lines {
            line.substitutes = substitutes_stmt
                .query_map(params![line_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            recipe.ingredients.push(line);
        }

        let mut tags_stmt = conn.prepare(
            "SELECT t.name FROM tags t JOIN cocktail_tag ct ON ct.tag_id = t.id
             WHERE ct.cocktail_id = ?1 ORDER BY t.name",
        )?;
        recipe.tags = tags_stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut images_stmt = conn.prepare(
            "SELECT id FROM images WHERE imageable_type = ?1 AND imageable_id = ?2 ORDER BY sort, id",
        )?;
        recipe.image_ids = images_stmt
            .query_map(params![COCKTAIL_IMAGEABLE, id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(recipe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn new_image(path: &str) -> NewImage {
        NewImage {
            owner_id: 1,
            file_path: path.to_string(),
            file_extension: "jpg".to_string(),
            sort: 1,
            copyright: None,
            placeholder_hash: "hash".to_string(),
        }
    }

    #[test]
    fn test_insert_row_ignores_unknown_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_row(
                ArchiveTable::Glasses,
                &row(json!({"id": 1, "name": "Coupe", "legacy_column": true})),
            )
            .unwrap();

        assert_eq!(store.count_rows(ArchiveTable::Glasses).unwrap(), 1);
    }

    #[test]
    fn test_insert_row_missing_required_column_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.insert_row(ArchiveTable::Cocktails, &row(json!({"id": 1, "name": "Gimlet"})));

        assert!(matches!(result, Err(BarbackError::Database { .. })));
        assert_eq!(store.count_rows(ArchiveTable::Cocktails).unwrap(), 0);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.insert_row(
            ArchiveTable::CocktailIngredients,
            &row(json!({"id": 1, "cocktail_id": 9, "ingredient_id": 9, "amount": 30})),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate_children_then_parents() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_row(ArchiveTable::Glasses, &row(json!({"id": 1, "name": "Coupe"})))
            .unwrap();
        store
            .insert_row(
                ArchiveTable::Cocktails,
                &row(json!({"id": 1, "name": "Daiquiri", "instructions": "Shake", "glass_id": 1})),
            )
            .unwrap();

        // Parent first violates the foreign key from cocktails.glass_id.
        assert!(store.truncate(ArchiveTable::Glasses).is_err());

        for table in ArchiveTable::truncate_order() {
            store.truncate(table).unwrap();
        }
        assert_eq!(store.count_rows(ArchiveTable::Glasses).unwrap(), 0);
        assert_eq!(store.count_rows(ArchiveTable::Cocktails).unwrap(), 0);
    }

    #[test]
    fn test_image_paths_are_unique() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_image(&new_image("temp/a.jpg")).unwrap();
        assert!(store.insert_image(&new_image("temp/a.jpg")).is_err());
    }

    #[test]
    fn test_update_image_metadata_only_touches_supplied_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let image = store.insert_image(&new_image("temp/b.jpg")).unwrap();

        let updated = store
            .update_image_metadata(
                image.id,
                &ImageMetadataUpdate {
                    copyright: Some("© Bar".to_string()),
                    sort: Some(0),
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.copyright.as_deref(), Some("© Bar"));
        assert_eq!(updated.sort, 1);
        assert_eq!(updated.placeholder_hash.as_deref(), Some("hash"));
        assert_eq!(updated.file_path, "temp/b.jpg");

        assert!(store
            .update_image_metadata(999, &ImageMetadataUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_recipe_round_trips_aggregate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gin = store
            .insert_catalog_entry(
                CatalogKind::Ingredient,
                &NewCatalogEntry {
                    scope_id: 1,
                    name: "Gin".into(),
                    description: "test".into(),
                },
            )
            .unwrap();
        let lime = store
            .insert_catalog_entry(
                CatalogKind::Ingredient,
                &NewCatalogEntry {
                    scope_id: 1,
                    name: "Lime juice".into(),
                    description: "test".into(),
                },
            )
            .unwrap();
        let image = store.insert_image(&new_image("temp/gimlet.jpg")).unwrap();

        let id = store
            .create_recipe(&NewRecipe {
                owner_id: 1,
                name: "Gimlet".into(),
                instructions: "Shake with ice".into(),
                description: None,
                garnish: Some("Lime wheel".into()),
                source: Some("https://example.com/gimlet".into()),
                glass_id: None,
                ingredients: vec![
                    RecipeIngredientLine {
                        ingredient_id: gin,
                        name: "gin".into(),
                        amount: 60.0,
                        units: "ml".into(),
                        sort: 1,
                        optional: false,
                        substitutes: vec![],
                    },
                    RecipeIngredientLine {
                        ingredient_id: lime,
                        name: "lime juice".into(),
                        amount: 22.5,
                        units: "ml".into(),
                        sort: 2,
                        optional: false,
                        substitutes: vec![gin],
                    },
                ],
                image_ids: vec![image.id],
                tags: vec!["Sour".into(), "sour".into(), "Classic".into()],
            })
            .unwrap();

        let recipe = store.find_recipe(id).unwrap().unwrap();
        assert_eq!(recipe.name, "Gimlet");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[1].sort, 2);
        assert_eq!(recipe.ingredients[1].substitutes, vec![gin]);
        assert_eq!(recipe.tags, vec!["Classic".to_string(), "Sour".to_string()]);
        assert_eq!(recipe.image_ids, vec![image.id]);
    }

    #[test]
    fn test_tags_match_case_insensitively_across_recipes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let recipe = |name: &str, tag: &str| NewRecipe {
            owner_id: 1,
            name: name.into(),
            instructions: "Stir".into(),
            description: None,
            garnish: None,
            source: None,
            glass_id: None,
            ingredients: vec![],
            image_ids: vec![],
            tags: vec![tag.into()],
        };

        let first = store.create_recipe(&recipe("Kir", "Été")).unwrap();
        let second = store.create_recipe(&recipe("Kir royal", "ÉTÉ")).unwrap();

        assert_eq!(store.count_rows(ArchiveTable::Tags).unwrap(), 1);
        assert_eq!(store.find_recipe(first).unwrap().unwrap().tags, vec!["Été"]);
        assert_eq!(store.find_recipe(second).unwrap().unwrap().tags, vec!["Été"]);
    }

    #[test]
    fn test_create_recipe_rolls_back_on_missing_image() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.create_recipe(&NewRecipe {
            owner_id: 1,
            name: "Negroni".into(),
            instructions: "Stir".into(),
            description: None,
            garnish: None,
            source: None,
            glass_id: None,
            ingredients: vec![],
            image_ids: vec![42],
            tags: vec![],
        });

        assert!(matches!(result, Err(BarbackError::NotFound { id: 42, .. })));
        assert_eq!(store.count_rows(ArchiveTable::Cocktails).unwrap(), 0);
    }
}
