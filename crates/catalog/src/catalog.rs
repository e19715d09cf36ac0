//! The catalog table and its shared handle

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{CatalogError, Result};

/// A single catalog record: a display name plus whatever else the source
/// endpoint returned for it, kept opaque.
///
/// Entries are immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Display name, exactly as the source spelled it
    pub name: String,
    /// Remaining fields of the source object, unmodified
    pub attributes: Value,
}

impl CatalogEntry {
    /// Build an entry from a source JSON object.
    ///
    /// Returns `None` if the object has no string `Name` field. Objects
    /// without a name cannot be looked up and are skipped by the loader.
    fn from_object(mut object: serde_json::Map<String, Value>) -> Option<Self> {
        let name = match object.remove("Name") {
            Some(Value::String(name)) => name,
            _ => return None,
        };
        Some(Self {
            name,
            attributes: Value::Object(object),
        })
    }
}

/// Case-insensitive name → entry lookup table.
///
/// Built wholesale by a refresh and then read-only; see [`SharedCatalog`]
/// for how readers and the refresher share it.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Keyed by lowercased name
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from entries, first match wins on name collisions
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    /// Parse a catalog from the source endpoint's JSON body.
    ///
    /// The body must be a JSON array of objects, each exposing at least a
    /// string `Name` field. Array elements without one are skipped with a
    /// warning rather than failing the whole refresh.
    pub fn from_json_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(CatalogError::NotAnArray),
        };

        let mut catalog = Self::new();
        let mut skipped = 0usize;
        for item in items {
            match item {
                Value::Object(object) => match CatalogEntry::from_object(object) {
                    Some(entry) => catalog.insert(entry),
                    None => skipped += 1,
                },
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "catalog entries without a Name field were skipped");
        }
        Ok(catalog)
    }

    /// Insert an entry; keeps the existing entry if the (case-folded) name
    /// is already present
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries
            .entry(entry.name.to_lowercase())
            .or_insert(entry);
    }

    /// Case-insensitive exact-name lookup
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&name.to_lowercase())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to the current catalog.
///
/// Readers call [`SharedCatalog::load`] and get a consistent table; the
/// refresher replaces the whole table with [`SharedCatalog::swap`]. There is
/// no in-place mutation visible to readers.
#[derive(Debug, Clone)]
pub struct SharedCatalog {
    inner: Arc<ArcSwap<Catalog>>,
}

impl SharedCatalog {
    /// Create a handle holding an empty catalog
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(Catalog::new())),
        }
    }

    /// Create a handle holding the given catalog
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(catalog)),
        }
    }

    /// Get the current table
    pub fn load(&self) -> Arc<Catalog> {
        self.inner.load_full()
    }

    /// Replace the table wholesale
    pub fn swap(&self, catalog: Catalog) {
        self.inner.store(Arc::new(catalog));
    }
}

impl Default for SharedCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
