//! Documented defaults for the retrieval pipeline
//!
//! All tunable parameters live here with the rationale for their values.
//! `RetrievalConfig` reads these as defaults and allows env overrides; the
//! source system iterated on several of them (thresholds 60-75, caps 2-7)
//! without settling, so treat them as starting points rather than truths.

// =============================================================================
// ENTITY LINKING
// =============================================================================

/// Minimum fuzzy-match score (0-100) for a candidate to link to a graph entity
///
/// Below ~70 the composite similarity starts accepting unrelated names that
/// merely share a common word ("New York" vs "New Delhi" scores ~65).
/// 75 keeps single-typo and reordered-token matches while rejecting those.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 75.0;

/// Fuzzy matches kept per extracted candidate
///
/// A candidate string rarely refers to more than one graph entity; keeping
/// two covers the "abbreviation plus full name" case without flooding the
/// strategy with near-duplicates.
pub const DEFAULT_MAX_MATCHES_PER_CANDIDATE: usize = 2;

/// Matches a single candidate may contribute to the final matched list
pub const DEFAULT_MAX_CANDIDATE_CONTRIBUTION: usize = 3;

/// Global cap on matched entities handed to the retrieval strategy
///
/// Pairwise path search is O(n^2) in matched entities; five entities means
/// ten BFS runs, which is the most a single question realistically needs.
pub const DEFAULT_MAX_MATCHED_ENTITIES: usize = 5;

// =============================================================================
// RELATIONSHIP RETRIEVAL
// =============================================================================

/// Hop limit for path search and neighborhood expansion
///
/// Two hops covers "A relates to B via C". Three and beyond retrieves facts
/// with no discernible connection to the question.
pub const DEFAULT_MAX_HOPS: usize = 2;

/// Facts fetched per node during BFS neighbor expansion
///
/// Bounds the per-node store query; hub nodes with hundreds of edges would
/// otherwise dominate both query cost and the result set.
pub const DEFAULT_NEIGHBOR_EXPANSION_LIMIT: usize = 15;

/// Shortest/least-redundant paths kept per entity pair
pub const DEFAULT_MAX_PATHS_PER_PAIR: usize = 3;

/// Global cap on facts returned by any strategy tier
pub const DEFAULT_MAX_TOTAL_FACTS: usize = 30;

/// Facts fetched for the exclusive single-entity tier
pub const DEFAULT_MAX_FACTS_PER_ENTITY: usize = 7;

/// Facts fetched per entity by the minimal fallback tier
pub const DEFAULT_FALLBACK_FACTS_PER_ENTITY: usize = 3;

/// Worker threads for pairwise path search and neighborhood expansion
///
/// Each lookup is an independent store round trip; four concurrent lookups
/// keeps an embedded store busy without overwhelming a remote one.
pub const DEFAULT_LOOKUP_WORKERS: usize = 4;

// =============================================================================
// CANDIDATE EXTRACTION
// =============================================================================

/// Minimum token length considered during extraction
pub const MIN_TOKEN_LEN: usize = 2;
