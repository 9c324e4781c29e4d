//! Knowledge-Graph Context Retrieval
//!
//! Augments free-text question answering with structured context drawn from
//! a graph of (subject, predicate, object) facts.
//!
//! # Pipeline
//! - Rule-based candidate-entity extraction from query text
//! - Fuzzy linking of candidates to canonical graph entities
//! - Tiered relationship retrieval (single entity, connecting paths,
//!   shared-context hubs, minimal fallback)
//! - Context assembly into a single text block for the answer generator
//!
//! Storage is embedded RocksDB; the whole pipeline is read-only over the
//! graph and safe to share across query threads.

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod extractor;
pub mod linker;
pub mod retriever;
pub mod store;
pub mod strategy;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use parking_lot;
pub use uuid;

pub use config::RetrievalConfig;
pub use retriever::{KgContext, KnowledgeGraphRetriever};
pub use store::{Entity, Fact, GraphStats, GraphStore, MatchedEntity, RocksGraphStore};
pub use strategy::StrategyKind;
