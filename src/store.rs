//! Graph store collaborator: record types, read interface, embedded backend
//!
//! The retrieval engine only ever uses the read side (`GraphStore`). The
//! write side on `RocksGraphStore` belongs to the external ingestion path
//! and to tests; nothing in this crate mutates the graph during retrieval.

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use rocksdb::{Options, DB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Entity node: canonical name plus free-text description
///
/// `name` is the canonical key, title-cased and trimmed on write and lookup.
/// One description per canonical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub description: String,
}

/// Directed fact triple linking two entity names
///
/// Stored directed, traversed as an undirected edge. Endpoints reference
/// canonical entity names but are not enforced as foreign keys; dangling
/// references are tolerated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Fact {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: canonical_name(subject),
            predicate: predicate.trim().to_string(),
            object: canonical_name(object),
        }
    }

    /// Whether the fact touches the given canonical name as subject or object
    pub fn involves(&self, name: &str) -> bool {
        self.subject == name || self.object == name
    }

    /// The endpoint opposite to `name` (undirected traversal)
    pub fn other_end<'a>(&'a self, name: &str) -> &'a str {
        if self.subject == name {
            &self.object
        } else {
            &self.subject
        }
    }
}

/// Entity match produced by fuzzy linking
///
/// `confidence` is a string-similarity score in [0, 100], not a graph
/// property.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedEntity {
    pub name: String,
    pub confidence: f32,
}

/// Graph size counters for reporting
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub entities: usize,
    pub facts: usize,
}

/// Canonicalize an entity name: trim and title-case each word
///
/// Matches the normalization applied on write, so lookups with arbitrary
/// casing ("germany", "GERMANY") hit the stored record.
pub fn canonical_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read-only interface the retrieval engine requires from a graph store
///
/// Implementations doing remote I/O are expected to enforce their own call
/// timeouts; callers treat any `Err` as zero results for that sub-operation.
pub trait GraphStore: Send + Sync {
    /// All canonical entity names, in a stable order
    fn entity_names(&self) -> Result<Vec<String>>;

    /// Entity record by exact canonical name
    fn entity_by_name(&self, name: &str) -> Result<Option<Entity>>;

    /// Facts where `name` is subject or object, up to `limit`
    fn facts_touching(&self, name: &str, limit: usize) -> Result<Vec<Fact>>;

    /// All facts directly linking `a` and `b`, in either direction
    ///
    /// Unlike `facts_touching` this is a targeted lookup with no result
    /// limit: the caller asked about one specific pair and must see every
    /// edge between them regardless of how many other edges touch `a`.
    fn facts_between(&self, a: &str, b: &str) -> Result<Vec<Fact>>;

    /// Entity and fact counts
    fn stats(&self) -> Result<GraphStats>;
}

/// Embedded RocksDB graph store
///
/// One DB per record family plus a name -> fact-id inverted index, bincode
/// encoding throughout. The in-memory name set mirrors the entities DB so
/// `entity_names()` never touches disk.
pub struct RocksGraphStore {
    /// Canonical name -> Entity
    entities_db: Arc<DB>,

    /// Fact UUID -> Fact
    facts_db: Arc<DB>,

    /// Canonical name -> list of fact UUIDs touching it
    fact_index_db: Arc<DB>,

    /// In-memory entity name set, sorted for deterministic snapshots
    names: Arc<RwLock<BTreeSet<String>>>,

    /// Counters for O(1) stats
    entity_count: Arc<AtomicUsize>,
    fact_count: Arc<AtomicUsize>,

    /// Serializes read-modify-write updates of fact index entries
    index_update_lock: Arc<Mutex<()>>,
}

impl RocksGraphStore {
    /// Open (or create) a store under the given directory
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let entities_db = Arc::new(DB::open(&opts, path.join("kg_entities"))?);
        let facts_db = Arc::new(DB::open(&opts, path.join("kg_facts"))?);
        let fact_index_db = Arc::new(DB::open(&opts, path.join("kg_fact_index"))?);

        // Load the name set and counters once at startup
        let mut names = BTreeSet::new();
        for (key, _) in entities_db.iterator(rocksdb::IteratorMode::Start).flatten() {
            if let Ok(name) = std::str::from_utf8(&key) {
                names.insert(name.to_string());
            }
        }

        let entity_count = names.len();
        let fact_count = facts_db.iterator(rocksdb::IteratorMode::Start).count();

        if entity_count > 0 || fact_count > 0 {
            tracing::info!(
                "Opened graph store with {} entities, {} facts",
                entity_count,
                fact_count
            );
        }

        Ok(Self {
            entities_db,
            facts_db,
            fact_index_db,
            names: Arc::new(RwLock::new(names)),
            entity_count: Arc::new(AtomicUsize::new(entity_count)),
            fact_count: Arc::new(AtomicUsize::new(fact_count)),
            index_update_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Insert or replace an entity record (ingestion path)
    ///
    /// The name is canonicalized before storage; re-inserting an existing
    /// name overwrites its description.
    pub fn put_entity(&self, name: &str, description: &str) -> Result<()> {
        let entity = Entity {
            name: canonical_name(name),
            description: description.trim().to_string(),
        };

        let value = bincode::serde::encode_to_vec(&entity, bincode::config::standard())?;
        let is_new = {
            let mut names = self.names.write();
            names.insert(entity.name.clone())
        };
        self.entities_db.put(entity.name.as_bytes(), value)?;

        if is_new {
            self.entity_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Insert a fact triple (ingestion path)
    ///
    /// Endpoints are canonicalized; the fact is indexed under both endpoints
    /// so undirected lookups stay O(edges touching the name).
    pub fn add_fact(&self, subject: &str, predicate: &str, object: &str) -> Result<Uuid> {
        let fact = Fact::new(subject, predicate, object);
        let uuid = Uuid::new_v4();

        let value = bincode::serde::encode_to_vec(&fact, bincode::config::standard())?;
        self.facts_db.put(uuid.as_bytes(), value)?;

        self.index_fact(&fact.subject, &uuid)?;
        if fact.object != fact.subject {
            self.index_fact(&fact.object, &uuid)?;
        }

        self.fact_count.fetch_add(1, Ordering::Relaxed);
        Ok(uuid)
    }

    /// Append a fact id to the index entry for `name`
    fn index_fact(&self, name: &str, uuid: &Uuid) -> Result<()> {
        let _guard = self.index_update_lock.lock();

        let mut ids: Vec<[u8; 16]> = match self.fact_index_db.get(name.as_bytes())? {
            Some(value) => {
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map(|(v, _)| v)
                    .unwrap_or_else(|e| {
                        tracing::warn!("Corrupt fact index for '{}': {}", name, e);
                        Vec::new()
                    })
            }
            None => Vec::new(),
        };

        ids.push(*uuid.as_bytes());
        let encoded = bincode::serde::encode_to_vec(&ids, bincode::config::standard())?;
        self.fact_index_db.put(name.as_bytes(), encoded)?;
        Ok(())
    }

    /// Fetch a fact by id, skipping records that fail to decode
    fn get_fact(&self, id: &[u8; 16]) -> Result<Option<Fact>> {
        match self.facts_db.get(id)? {
            Some(value) => {
                match bincode::serde::decode_from_slice(&value, bincode::config::standard()) {
                    Ok((fact, _)) => Ok(Some(fact)),
                    Err(e) => {
                        tracing::warn!("Skipping undecodable fact record: {}", e);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }
}

impl GraphStore for RocksGraphStore {
    fn entity_names(&self) -> Result<Vec<String>> {
        Ok(self.names.read().iter().cloned().collect())
    }

    fn entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        let canonical = canonical_name(name);
        match self.entities_db.get(canonical.as_bytes())? {
            Some(value) => {
                match bincode::serde::decode_from_slice(&value, bincode::config::standard()) {
                    Ok((entity, _)) => Ok(Some(entity)),
                    Err(e) => {
                        tracing::warn!("Skipping undecodable entity '{}': {}", canonical, e);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }

    fn facts_touching(&self, name: &str, limit: usize) -> Result<Vec<Fact>> {
        let canonical = canonical_name(name);
        let ids: Vec<[u8; 16]> = match self.fact_index_db.get(canonical.as_bytes())? {
            Some(value) => {
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map(|(v, _)| v)
                    .unwrap_or_else(|e| {
                        tracing::warn!("Corrupt fact index for '{}': {}", canonical, e);
                        Vec::new()
                    })
            }
            None => Vec::new(),
        };

        let mut facts = Vec::with_capacity(limit.min(ids.len()));
        for id in ids {
            if facts.len() >= limit {
                break;
            }
            if let Some(fact) = self.get_fact(&id)? {
                facts.push(fact);
            }
        }
        Ok(facts)
    }

    fn facts_between(&self, a: &str, b: &str) -> Result<Vec<Fact>> {
        let a = canonical_name(a);
        let b = canonical_name(b);

        let ids: Vec<[u8; 16]> = match self.fact_index_db.get(a.as_bytes())? {
            Some(value) => {
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map(|(v, _)| v)
                    .unwrap_or_else(|e| {
                        tracing::warn!("Corrupt fact index for '{}': {}", a, e);
                        Vec::new()
                    })
            }
            None => Vec::new(),
        };

        let mut facts = Vec::new();
        for id in ids {
            if let Some(fact) = self.get_fact(&id)? {
                // Every indexed fact touches `a`; keep those also touching `b`
                if fact.involves(&b) {
                    facts.push(fact);
                }
            }
        }
        Ok(facts)
    }

    fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            entities: self.entity_count.load(Ordering::Relaxed),
            facts: self.fact_count.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (RocksGraphStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RocksGraphStore::open(temp_dir.path()).expect("Failed to open store");
        (store, temp_dir)
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("germany"), "Germany");
        assert_eq!(canonical_name("  new york city "), "New York City");
        assert_eq!(canonical_name("EUROBASKET"), "Eurobasket");
        assert_eq!(canonical_name(""), "");
    }

    #[test]
    fn test_put_and_get_entity() {
        let (store, _dir) = setup_store();
        store.put_entity("germany", "A country in Europe").unwrap();

        let entity = store.entity_by_name("GERMANY").unwrap().unwrap();
        assert_eq!(entity.name, "Germany");
        assert_eq!(entity.description, "A country in Europe");
    }

    #[test]
    fn test_put_entity_overwrites_description() {
        let (store, _dir) = setup_store();
        store.put_entity("Germany", "old").unwrap();
        store.put_entity("germany", "new").unwrap();

        let entity = store.entity_by_name("Germany").unwrap().unwrap();
        assert_eq!(entity.description, "new");
        assert_eq!(store.stats().unwrap().entities, 1);
    }

    #[test]
    fn test_facts_touching_both_directions() {
        let (store, _dir) = setup_store();
        store.add_fact("Germany", "beat", "Lithuania").unwrap();
        store.add_fact("Lithuania", "plays_in", "Eurobasket").unwrap();

        let facts = store.facts_touching("lithuania", 10).unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.involves("Lithuania")));
    }

    #[test]
    fn test_facts_touching_respects_limit() {
        let (store, _dir) = setup_store();
        for i in 0..10 {
            store
                .add_fact("Hub", "links_to", &format!("Node{i}"))
                .unwrap();
        }

        let facts = store.facts_touching("Hub", 3).unwrap();
        assert_eq!(facts.len(), 3);
    }

    #[test]
    fn test_self_loop_indexed_once() {
        let (store, _dir) = setup_store();
        store.add_fact("Ouroboros", "eats", "Ouroboros").unwrap();

        let facts = store.facts_touching("Ouroboros", 10).unwrap();
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_facts_between_ignores_unrelated_edges() {
        let (store, _dir) = setup_store();
        // Bury the pair's edges behind a pile of unrelated ones
        for i in 0..20 {
            store
                .add_fact("Hub", "links_to", &format!("Node{i}"))
                .unwrap();
        }
        store.add_fact("Germany", "joined", "Hub").unwrap();
        store.add_fact("Hub", "hosts", "Germany").unwrap();

        let facts = store.facts_between("hub", "GERMANY").unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.contains(&Fact::new("Germany", "joined", "Hub")));
        assert!(facts.contains(&Fact::new("Hub", "hosts", "Germany")));

        assert!(store.facts_between("Hub", "Atlantis").unwrap().is_empty());
    }

    #[test]
    fn test_stats_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksGraphStore::open(dir.path()).unwrap();
            store.put_entity("Germany", "desc").unwrap();
            store.put_entity("Finland", "desc").unwrap();
            store.add_fact("Germany", "borders", "Denmark").unwrap();
        }

        // Counters and the name set are rebuilt on reopen
        let store = RocksGraphStore::open(dir.path()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.entities, 2);
        assert_eq!(stats.facts, 1);
        assert_eq!(store.entity_names().unwrap(), vec!["Finland", "Germany"]);
    }

    #[test]
    fn test_dangling_fact_endpoints_tolerated() {
        let (store, _dir) = setup_store();
        // No entity records exist for either endpoint
        store.add_fact("Ghost", "haunts", "Nowhere").unwrap();

        assert_eq!(store.facts_touching("Ghost", 5).unwrap().len(), 1);
        assert!(store.entity_by_name("Ghost").unwrap().is_none());
    }
}
