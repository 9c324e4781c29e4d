//! Configuration for the retrieval pipeline
//!
//! Sensible defaults from `constants`, overridable through `KG_*` environment
//! variables in production.

use std::env;
use tracing::info;

use crate::constants::{
    DEFAULT_FALLBACK_FACTS_PER_ENTITY, DEFAULT_FUZZY_THRESHOLD, DEFAULT_LOOKUP_WORKERS,
    DEFAULT_MAX_CANDIDATE_CONTRIBUTION, DEFAULT_MAX_FACTS_PER_ENTITY, DEFAULT_MAX_HOPS,
    DEFAULT_MAX_MATCHED_ENTITIES, DEFAULT_MAX_MATCHES_PER_CANDIDATE, DEFAULT_MAX_PATHS_PER_PAIR,
    DEFAULT_MAX_TOTAL_FACTS, DEFAULT_NEIGHBOR_EXPANSION_LIMIT,
};

/// Tunable parameters for extraction, linking and relationship retrieval
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Minimum fuzzy-match score (0-100) for entity linking
    pub fuzzy_threshold: f32,

    /// Fuzzy matches kept per extracted candidate
    pub max_matches_per_candidate: usize,

    /// Matches one candidate may contribute after limiting
    pub max_candidate_contribution: usize,

    /// Global cap on matched entities passed to the strategy
    pub max_matched_entities: usize,

    /// Hop limit for path search and neighborhood expansion
    pub max_hops: usize,

    /// Facts fetched per node during neighbor expansion
    pub neighbor_expansion_limit: usize,

    /// Shortest paths kept per entity pair
    pub max_paths_per_pair: usize,

    /// Global cap on facts returned by any strategy tier
    pub max_total_facts: usize,

    /// Facts fetched by the single-entity tier
    pub max_facts_per_entity: usize,

    /// Facts fetched per entity by the minimal fallback tier
    pub fallback_facts_per_entity: usize,

    /// Worker threads for pairwise and per-entity store lookups
    pub lookup_workers: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_matches_per_candidate: DEFAULT_MAX_MATCHES_PER_CANDIDATE,
            max_candidate_contribution: DEFAULT_MAX_CANDIDATE_CONTRIBUTION,
            max_matched_entities: DEFAULT_MAX_MATCHED_ENTITIES,
            max_hops: DEFAULT_MAX_HOPS,
            neighbor_expansion_limit: DEFAULT_NEIGHBOR_EXPANSION_LIMIT,
            max_paths_per_pair: DEFAULT_MAX_PATHS_PER_PAIR,
            max_total_facts: DEFAULT_MAX_TOTAL_FACTS,
            max_facts_per_entity: DEFAULT_MAX_FACTS_PER_ENTITY,
            fallback_facts_per_entity: DEFAULT_FALLBACK_FACTS_PER_ENTITY,
            lookup_workers: DEFAULT_LOOKUP_WORKERS,
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("KG_FUZZY_THRESHOLD") {
            if let Ok(n) = val.parse::<f32>() {
                config.fuzzy_threshold = n.clamp(0.0, 100.0);
            }
        }

        if let Ok(val) = env::var("KG_MATCHES_PER_CANDIDATE") {
            if let Ok(n) = val.parse() {
                config.max_matches_per_candidate = n;
            }
        }

        if let Ok(val) = env::var("KG_CANDIDATE_CONTRIBUTION") {
            if let Ok(n) = val.parse() {
                config.max_candidate_contribution = n;
            }
        }

        if let Ok(val) = env::var("KG_MAX_MATCHED_ENTITIES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_matched_entities = n.max(1);
            }
        }

        if let Ok(val) = env::var("KG_MAX_HOPS") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_hops = n.clamp(1, 4);
            }
        }

        if let Ok(val) = env::var("KG_NEIGHBOR_LIMIT") {
            if let Ok(n) = val.parse() {
                config.neighbor_expansion_limit = n;
            }
        }

        if let Ok(val) = env::var("KG_MAX_PATHS_PER_PAIR") {
            if let Ok(n) = val.parse() {
                config.max_paths_per_pair = n;
            }
        }

        if let Ok(val) = env::var("KG_MAX_TOTAL_FACTS") {
            if let Ok(n) = val.parse() {
                config.max_total_facts = n;
            }
        }

        if let Ok(val) = env::var("KG_FACTS_PER_ENTITY") {
            if let Ok(n) = val.parse() {
                config.max_facts_per_entity = n;
            }
        }

        if let Ok(val) = env::var("KG_FALLBACK_FACTS") {
            if let Ok(n) = val.parse() {
                config.fallback_facts_per_entity = n;
            }
        }

        if let Ok(val) = env::var("KG_LOOKUP_WORKERS") {
            if let Ok(n) = val.parse::<usize>() {
                config.lookup_workers = n.clamp(1, 16);
            }
        }

        config
    }

    /// Log the active configuration
    pub fn log(&self) {
        info!("Retrieval configuration:");
        info!(
            "   Linking: threshold={:.1}, {} matches/candidate, {} per-candidate, {} total",
            self.fuzzy_threshold,
            self.max_matches_per_candidate,
            self.max_candidate_contribution,
            self.max_matched_entities
        );
        info!(
            "   Strategy: {} hops, {} facts/expansion, {} paths/pair, {} facts max",
            self.max_hops,
            self.neighbor_expansion_limit,
            self.max_paths_per_pair,
            self.max_total_facts
        );
        info!(
            "   Per-entity caps: {} single-entity, {} fallback",
            self.max_facts_per_entity, self.fallback_facts_per_entity
        );
        info!("   Lookup workers: {}", self.lookup_workers);
    }
}
