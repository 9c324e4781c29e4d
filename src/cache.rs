//! Read-through cache of all known entity names
//!
//! Fuzzy linking scans every canonical name, so names are held in memory
//! rather than fetched per query. The cache is read-mostly shared state:
//! queries read an immutable snapshot, and an explicit `refresh()` after
//! external ingestion swaps in a new snapshot atomically, so readers never
//! observe a partially updated list.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::store::GraphStore;

pub struct EntityNameCache {
    store: Arc<dyn GraphStore>,

    /// Current snapshot; replaced wholesale on refresh
    names: RwLock<Arc<Vec<String>>>,

    /// When the snapshot was loaded, for staleness reporting
    loaded_at: RwLock<Option<DateTime<Utc>>>,
}

impl EntityNameCache {
    /// Create an empty cache; call `load()` before first use
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            names: RwLock::new(Arc::new(Vec::new())),
            loaded_at: RwLock::new(None),
        }
    }

    /// Load (or reload) all entity names from the store
    ///
    /// A store failure keeps the previous snapshot and logs the error;
    /// an empty snapshot simply means the linker finds no matches.
    pub fn load(&self) {
        match self.store.entity_names() {
            Ok(names) => {
                tracing::info!("Loaded {} entity names into cache", names.len());
                *self.names.write() = Arc::new(names);
                *self.loaded_at.write() = Some(Utc::now());
            }
            Err(e) => {
                tracing::error!("Failed loading entity names: {}", e);
            }
        }
    }

    /// Refresh after entities were added externally
    pub fn refresh(&self) {
        self.load();
    }

    /// Cheap handle to the current snapshot
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.names.read())
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        *self.loaded_at.read()
    }
}
