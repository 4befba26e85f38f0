//! Free-text name resolution against the ingredient and glass catalogs.

use crate::error::{BarbackError, Result};
use crate::models::{match_key, CatalogEntry, CatalogId, CatalogKind, NewCatalogEntry};
use crate::store::CatalogStore;
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves names to catalog ids for one batch of resolutions.
///
/// The name cache is seeded from a single catalog snapshot and lives only as
/// long as this value, so concurrent imports never share it. Entries created
/// during the session are added to the cache, which keeps repeated mentions of
/// a new name from creating duplicates.
pub struct CatalogResolver<'a> {
    store: &'a dyn CatalogStore,
    kind: CatalogKind,
    known: HashMap<(i64, String), CatalogId>,
    created: Vec<CatalogEntry>,
}

impl<'a> CatalogResolver<'a> {
    /// Start a session seeded with the current catalog of `kind`.
    pub fn seeded(store: &'a dyn CatalogStore, kind: CatalogKind) -> Result<Self> {
        let mut known = HashMap::new();
        for entry in store.catalog_snapshot(kind)? {
            // Oldest entry wins if the snapshot already holds duplicates.
            known
                .entry((entry.scope_id, entry.match_key()))
                .or_insert(entry.id);
        }
        debug!(kind = %kind, entries = known.len(), "Seeded catalog resolver");

        Ok(Self {
            store,
            kind,
            known,
            created: Vec::new(),
        })
    }

    /// Entries created by this session, in creation order.
    pub fn created(&self) -> &[CatalogEntry] {
        &self.created
    }

    /// Return the id matching `name` within `scope_id`, creating an entry
    /// described by `provenance` when none exists.
    pub fn resolve(&mut self, name: &str, scope_id: i64, provenance: &str) -> Result<CatalogId> {
        let key = match_key(name);
        if key.is_empty() {
            return Err(BarbackError::validation(
                self.kind.to_string(),
                "name must not be empty",
            ));
        }

        if let Some(id) = self.known.get(&(scope_id, key.clone())) {
            return Ok(*id);
        }

        let entry = NewCatalogEntry {
            scope_id,
            name: capitalize_first(name.trim()),
            description: provenance.to_string(),
        };
        let id = self.store.insert_catalog_entry(self.kind, &entry)?;
        info!(kind = %self.kind, id, entry = %entry.name, "Created catalog entry");

        self.known.insert((scope_id, key), id);
        self.created.push(CatalogEntry {
            id,
            kind: self.kind,
            scope_id,
            name: entry.name,
            description: Some(entry.description),
        });

        Ok(id)
    }
}

/// Upper-case the first character, leaving the rest as written.
fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
