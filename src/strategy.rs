//! Tiered relationship retrieval over the fact graph
//!
//! Given the matched entities for a query, selects which facts are worth
//! surfacing. Strategies are tried in a fixed order until one yields a
//! non-empty result:
//!
//! 1. `single_entity` - exactly one match: its direct facts (exclusive tier)
//! 2. `path_based` - bounded BFS for connecting paths between every pair
//! 3. `shared_context` - hub entities reachable from two or more matches
//! 4. `minimal_fallback` - a few facts per entity regardless of connectivity
//!
//! Every store lookup that fails degrades to zero results for that
//! sub-operation, so retrieval falls through tiers instead of surfacing
//! errors. Pairwise searches and neighborhood expansions run on a bounded
//! worker pool since each lookup is an independent store round trip.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::store::{canonical_name, Fact, GraphStore, MatchedEntity};

/// Which retrieval tier produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    SingleEntity,
    PathBased,
    SharedContext,
    MinimalFallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleEntity => "single_entity",
            Self::PathBased => "path_based",
            Self::SharedContext => "shared_context",
            Self::MinimalFallback => "minimal_fallback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tiered fact retrieval against a graph store
pub struct RelationshipStrategy {
    store: Arc<dyn GraphStore>,
    config: RetrievalConfig,
}

impl RelationshipStrategy {
    pub fn new(store: Arc<dyn GraphStore>, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Retrieve facts for the matched entities using the tiered strategy
    ///
    /// The returned fact list never contains duplicate triples and never
    /// exceeds the configured global cap.
    pub fn retrieve(&self, matched: &[MatchedEntity]) -> (Vec<Fact>, StrategyKind) {
        let entities: Vec<String> = matched
            .iter()
            .map(|m| canonical_name(&m.name))
            .collect();

        if entities.is_empty() {
            tracing::debug!("Strategy invoked with no matched entities");
            return (Vec::new(), StrategyKind::MinimalFallback);
        }

        // Tier 1: single entity, exclusive - returns whatever is found
        if entities.len() == 1 {
            let facts = self.facts_for(&entities[0], self.config.max_facts_per_entity);
            tracing::info!(
                "Strategy single_entity: {} facts for '{}'",
                facts.len(),
                entities[0]
            );
            return (dedup_facts(facts), StrategyKind::SingleEntity);
        }

        // Tier 2: connecting paths between every unordered pair
        let facts = self.path_based(&entities);
        if !facts.is_empty() {
            tracing::info!("Strategy path_based: {} facts", facts.len());
            return (facts, StrategyKind::PathBased);
        }

        // Tier 3: shared-context hubs
        let facts = self.shared_context(&entities);
        if !facts.is_empty() {
            tracing::info!("Strategy shared_context: {} facts", facts.len());
            return (facts, StrategyKind::SharedContext);
        }

        // Tier 4: a few facts per entity regardless of connectivity
        let facts = self.minimal_fallback(&entities);
        tracing::info!("Strategy minimal_fallback: {} facts", facts.len());
        (facts, StrategyKind::MinimalFallback)
    }

    /// Tier 2: merge the top paths between every pair of matched entities
    fn path_based(&self, entities: &[String]) -> Vec<Fact> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                // Identical canonical names are trivial pairs
                if entities[i] != entities[j] {
                    pairs.push((&entities[i], &entities[j]));
                }
            }
        }

        let per_pair = parallel_map(&pairs, self.config.lookup_workers, |(a, b)| {
            self.find_paths_between(a, b)
        });

        let mut facts = Vec::new();
        for paths in per_pair {
            for path in paths {
                facts.extend(path);
            }
        }

        let mut facts = dedup_facts(facts);
        facts.truncate(self.config.max_total_facts);
        facts
    }

    /// Bounded BFS for paths between two entities over undirected edges
    ///
    /// Visited tracking is per path, not global, so disjoint routes between
    /// the same pair are all found. Neighbor expansion is capped per node
    /// and a path is abandoned once its edge count reaches the hop limit.
    /// Returns the top paths sorted by (length, distinct predicates).
    pub fn find_paths_between(&self, from: &str, to: &str) -> Vec<Vec<Fact>> {
        let from = canonical_name(from);
        let to = canonical_name(to);
        if from == to {
            return Vec::new();
        }

        let mut queue: VecDeque<(String, Vec<Fact>, HashSet<String>)> = VecDeque::new();
        queue.push_back((from.clone(), Vec::new(), HashSet::from([from])));
        let mut paths: Vec<Vec<Fact>> = Vec::new();

        while let Some((current, path, visited)) = queue.pop_front() {
            if path.len() >= self.config.max_hops {
                continue;
            }

            for fact in self.facts_for(&current, self.config.neighbor_expansion_limit) {
                let next = fact.other_end(&current).to_string();
                if visited.contains(&next) {
                    continue;
                }

                let mut new_path = path.clone();
                new_path.push(fact);

                if next == to {
                    paths.push(new_path);
                } else {
                    let mut new_visited = visited.clone();
                    new_visited.insert(next.clone());
                    queue.push_back((next, new_path, new_visited));
                }
            }
        }

        // Shortest first, then fewest distinct predicates (least redundant)
        paths.sort_by_key(|path| {
            let predicates: HashSet<&str> =
                path.iter().map(|f| f.predicate.as_str()).collect();
            (path.len(), predicates.len())
        });
        paths.truncate(self.config.max_paths_per_pair);
        paths
    }

    /// Tier 3: facts mediated by hub entities shared between matches
    fn shared_context(&self, entities: &[String]) -> Vec<Fact> {
        let neighborhoods = parallel_map(entities, self.config.lookup_workers, |entity| {
            self.neighborhood(entity)
        });

        // Which matched entities reach each neighbor
        let mut connections: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (entity, neighborhood) in entities.iter().zip(&neighborhoods) {
            for neighbor in neighborhood {
                connections
                    .entry(neighbor.as_str())
                    .or_default()
                    .insert(entity.as_str());
            }
        }

        let matched_set: HashSet<&str> = entities.iter().map(String::as_str).collect();
        let hubs: Vec<(&str, &BTreeSet<&str>)> = connections
            .iter()
            .filter(|(hub, connected)| connected.len() >= 2 && !matched_set.contains(*hub))
            .map(|(hub, connected)| (*hub, connected))
            .collect();

        if !hubs.is_empty() {
            tracing::debug!("Found {} shared-context hubs", hubs.len());
        }

        let mut facts = Vec::new();
        for (hub, connected) in hubs {
            for entity in connected {
                facts.extend(self.direct_facts(hub, entity));
            }
        }

        let mut facts = dedup_facts(facts);
        facts.truncate(self.config.max_total_facts);
        facts
    }

    /// All entities within the hop limit of `entity`, including itself
    pub fn neighborhood(&self, entity: &str) -> HashSet<String> {
        let entity = canonical_name(entity);
        let mut visited: HashSet<String> = HashSet::from([entity.clone()]);
        let mut frontier: HashSet<String> = HashSet::from([entity]);

        for _ in 0..self.config.max_hops {
            let mut next = HashSet::new();
            for node in &frontier {
                for fact in self.facts_for(node, self.config.neighbor_expansion_limit) {
                    let neighbor = fact.other_end(node).to_string();
                    if visited.insert(neighbor.clone()) {
                        next.insert(neighbor);
                    }
                }
            }
            frontier = next;
        }

        visited
    }

    /// Direct facts between a hub and one matched entity
    ///
    /// Targeted pair lookup rather than a capped scan of the hub's edges:
    /// a high-degree hub must not hide its links to the matched entities
    /// behind the expansion limit.
    fn direct_facts(&self, hub: &str, entity: &str) -> Vec<Fact> {
        match self.store.facts_between(hub, entity) {
            Ok(facts) => facts,
            Err(e) => {
                tracing::warn!("Pair lookup failed for '{}' and '{}': {}", hub, entity, e);
                Vec::new()
            }
        }
    }

    /// Tier 4: a handful of facts per entity, connectivity ignored
    fn minimal_fallback(&self, entities: &[String]) -> Vec<Fact> {
        let per_entity = parallel_map(entities, self.config.lookup_workers, |entity| {
            self.facts_for(entity, self.config.fallback_facts_per_entity)
        });

        let mut facts = dedup_facts(per_entity.into_iter().flatten().collect());
        facts.truncate(self.config.max_total_facts);
        facts
    }

    /// Store lookup that degrades to empty on failure
    fn facts_for(&self, name: &str, limit: usize) -> Vec<Fact> {
        match self.store.facts_touching(name, limit) {
            Ok(facts) => facts,
            Err(e) => {
                tracing::warn!("Fact lookup failed for '{}': {}", name, e);
                Vec::new()
            }
        }
    }
}

/// Remove duplicate triples, keeping first occurrence order
pub fn dedup_facts(facts: Vec<Fact>) -> Vec<Fact> {
    let mut seen = HashSet::new();
    facts
        .into_iter()
        .filter(|fact| {
            seen.insert((
                fact.subject.clone(),
                fact.predicate.clone(),
                fact.object.clone(),
            ))
        })
        .collect()
}

/// Run `f` over `items` on a bounded worker pool, preserving input order
///
/// Workers pull the next index from a shared counter; results land in their
/// input slot, so the merged output is deterministic regardless of
/// scheduling.
fn parallel_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let workers = workers.clamp(1, items.len());
    if workers == 1 {
        return items.iter().map(f).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<R>>> = items.iter().map(|_| Mutex::new(None)).collect();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= items.len() {
                    break;
                }
                let result = f(&items[i]);
                *slots[i].lock() = Some(result);
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| slot.into_inner().expect("every work item produced a result"))
        .collect()
}
