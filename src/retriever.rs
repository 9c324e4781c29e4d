//! Query-to-context retrieval pipeline
//!
//! Ties the stages together: extract candidates from the query, link them
//! against the cached entity names, limit to a ranked matched-entity list,
//! run the tiered relationship strategy, and assemble the context block.
//! Every stage degrades to empty output on failure, so a query always gets
//! an answer, possibly an empty one.

use std::sync::Arc;

use anyhow::Result;

use crate::cache::EntityNameCache;
use crate::config::RetrievalConfig;
use crate::context::ContextAssembler;
use crate::extractor::CandidateExtractor;
use crate::linker::{limit_matches, EntityLinker};
use crate::store::{GraphStats, GraphStore, MatchedEntity};
use crate::strategy::{RelationshipStrategy, StrategyKind};

/// Result of one context retrieval
#[derive(Debug, Clone)]
pub struct KgContext {
    /// Formatted context block; empty when the graph offers nothing
    pub context: String,

    /// Which strategy tier produced the facts; `None` when no entity matched
    pub strategy: Option<StrategyKind>,

    /// Entities the query was linked to, ranked by confidence
    pub matched: Vec<MatchedEntity>,
}

impl KgContext {
    /// Strategy name for logs and metrics, empty when no entity matched
    pub fn strategy_label(&self) -> &'static str {
        self.strategy.map(|s| s.as_str()).unwrap_or("")
    }

    fn empty() -> Self {
        Self {
            context: String::new(),
            strategy: None,
            matched: Vec::new(),
        }
    }
}

/// Knowledge-graph context retriever
///
/// Read-only over the graph store. Shared across query threads; the only
/// mutable state is the entity-name cache, which is refreshed explicitly
/// after ingestion.
pub struct KnowledgeGraphRetriever {
    store: Arc<dyn GraphStore>,
    cache: EntityNameCache,
    extractor: CandidateExtractor,
    linker: EntityLinker,
    strategy: RelationshipStrategy,
    assembler: ContextAssembler,
    config: RetrievalConfig,
}

impl KnowledgeGraphRetriever {
    /// Build the pipeline and prime the entity-name cache
    pub fn new(store: Arc<dyn GraphStore>, config: RetrievalConfig) -> Self {
        config.log();

        let cache = EntityNameCache::new(Arc::clone(&store));
        cache.load();

        let linker = EntityLinker::new(config.fuzzy_threshold, config.max_matches_per_candidate);
        let strategy = RelationshipStrategy::new(Arc::clone(&store), config.clone());
        let assembler = ContextAssembler::new(Arc::clone(&store));

        Self {
            store,
            cache,
            extractor: CandidateExtractor::new(),
            linker,
            strategy,
            assembler,
            config,
        }
    }

    /// Retrieve knowledge-graph context for a free-text query
    pub fn retrieve_context(&self, query: &str) -> KgContext {
        if query.trim().is_empty() {
            tracing::debug!("Empty query, skipping knowledge-graph retrieval");
            return KgContext::empty();
        }

        // Stage 1: candidate extraction
        let candidates = self.extractor.extract(query);
        if candidates.is_empty() {
            tracing::info!("No candidate entities in query");
            return KgContext::empty();
        }
        tracing::info!("Extracted {} candidates from query", candidates.len());

        // Stage 2: fuzzy linking against the cached names
        let known = self.cache.snapshot();
        if known.is_empty() {
            tracing::warn!("Entity-name cache is empty, no linking possible");
            return KgContext::empty();
        }
        let link_results = self.linker.link_all(&candidates, &known);

        // Stage 3: limit to a ranked, deduplicated entity list
        let matched = limit_matches(
            &link_results,
            self.config.max_candidate_contribution,
            self.config.max_matched_entities,
        );
        if matched.is_empty() {
            tracing::info!("No candidates linked above threshold");
            return KgContext::empty();
        }
        for m in &matched {
            tracing::info!("Matched entity '{}' ({:.1}%)", m.name, m.confidence);
        }

        // Stage 4: tiered relationship retrieval
        let (facts, strategy) = self.strategy.retrieve(&matched);
        tracing::info!(
            "Retrieved {} facts via {} strategy",
            facts.len(),
            strategy.as_str()
        );

        // Stage 5: assembly
        let context = self.assembler.assemble(&facts, &matched);
        KgContext {
            context,
            strategy: Some(strategy),
            matched,
        }
    }

    /// Reload the entity-name cache after new entities were ingested
    pub fn refresh_entity_names(&self) {
        self.cache.refresh();
    }

    /// Entity and fact counts, for reporting
    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }
}
