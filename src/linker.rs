//! Fuzzy entity linking and match limiting
//!
//! Maps extracted candidates onto canonical graph entity names using a
//! weighted composite of string-similarity measures, then collapses the
//! per-candidate match lists into one ranked, deduplicated entity list.

use std::collections::BTreeSet;
use std::collections::HashSet;

use crate::store::MatchedEntity;

/// Weighted similarity between a candidate and an entity name, in [0, 100]
///
/// Composite of plain edit similarity, Jaro-Winkler, token-sort and
/// token-set measures, so the score tolerates typos, word reordering and
/// partial token overlap. Token measures are discounted to 0.95 of their
/// raw value so an exact full-string match always wins over a subset match.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let base = strsim::normalized_levenshtein(&a, &b);
    let jaro = strsim::jaro_winkler(&a, &b);
    let token_sort = strsim::normalized_levenshtein(&sorted_tokens(&a), &sorted_tokens(&b));
    let token_set = token_set_ratio(&a, &b);

    let best = base
        .max(jaro)
        .max(0.95 * token_sort)
        .max(0.95 * token_set);

    (best * 100.0) as f32
}

/// Tokens sorted and rejoined, for order-insensitive comparison
fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-set similarity: compares the shared-token core against each side's
/// full token set, so "germany" scores highly against "west germany team"
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    if common.is_empty() {
        return 0.0;
    }

    let diff_ab: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let diff_ba: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let core = common.join(" ");
    let full_a = join_nonempty(&core, &diff_ab.join(" "));
    let full_b = join_nonempty(&core, &diff_ba.join(" "));

    strsim::normalized_levenshtein(&core, &full_a)
        .max(strsim::normalized_levenshtein(&core, &full_b))
        .max(strsim::normalized_levenshtein(&full_a, &full_b))
}

fn join_nonempty(head: &str, tail: &str) -> String {
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{head} {tail}")
    }
}

/// Fuzzy linker from candidates to known graph entity names
#[derive(Debug, Clone)]
pub struct EntityLinker {
    /// Minimum score for a match to count
    pub threshold: f32,

    /// Matches kept per candidate
    pub max_matches: usize,
}

impl EntityLinker {
    pub fn new(threshold: f32, max_matches: usize) -> Self {
        Self {
            threshold,
            max_matches,
        }
    }

    /// Rank known names against one candidate
    ///
    /// Returns at most `max_matches` pairs scoring at or above the
    /// threshold, best first. Ties break on name so the ranking is
    /// deterministic for a fixed known-names snapshot.
    pub fn link(&self, candidate: &str, known_names: &[String]) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = known_names
            .iter()
            .map(|name| (name.clone(), similarity(candidate, name)))
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(self.max_matches);
        scored
    }

    /// Link every candidate, preserving candidate order
    pub fn link_all(
        &self,
        candidates: &[String],
        known_names: &[String],
    ) -> Vec<(String, Vec<(String, f32)>)> {
        candidates
            .iter()
            .map(|candidate| (candidate.clone(), self.link(candidate, known_names)))
            .collect()
    }
}

/// Collapse per-candidate link results into one matched-entity list
///
/// Each candidate contributes at most `per_candidate` matches; an entity
/// already claimed by an earlier candidate keeps its first-seen score. The
/// result is deduplicated by name, ranked by descending confidence and
/// capped at `max_total`.
pub fn limit_matches(
    link_results: &[(String, Vec<(String, f32)>)],
    per_candidate: usize,
    max_total: usize,
) -> Vec<MatchedEntity> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut matched = Vec::new();

    for (_, matches) in link_results {
        for (name, score) in matches.iter().take(per_candidate) {
            if seen.insert(name.as_str()) {
                matched.push(MatchedEntity {
                    name: name.clone(),
                    confidence: *score,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equal confidences
    matched.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matched.truncate(max_total);
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_scores_100() {
        assert_eq!(similarity("Germany", "germany"), 100.0);
    }

    #[test]
    fn test_typo_tolerated() {
        assert!(similarity("Germny", "Germany") > 80.0);
    }

    #[test]
    fn test_token_reordering_tolerated() {
        assert!(similarity("York New", "New York") > 90.0);
    }

    #[test]
    fn test_partial_overlap_scores_high() {
        // Query phrase containing the entity name plus extra tokens
        assert!(similarity("germany national team", "Germany") > 75.0);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        assert!(similarity("Lithuania", "Eurobasket") < 60.0);
    }

    #[test]
    fn test_link_respects_threshold() {
        let linker = EntityLinker::new(75.0, 5);
        let known = names(&["Germany", "Lithuania", "Eurobasket"]);

        for (_, score) in linker.link("Germany", &known) {
            assert!(score >= 75.0);
        }
    }

    #[test]
    fn test_link_respects_cap() {
        let linker = EntityLinker::new(10.0, 2);
        let known = names(&["Germany", "German Empire", "Germantown", "Germania"]);

        assert!(linker.link("Germany", &known).len() <= 2);
    }

    #[test]
    fn test_link_is_deterministic() {
        let linker = EntityLinker::new(50.0, 3);
        let known = names(&["Germany", "German Empire", "Germania"]);

        assert_eq!(linker.link("German", &known), linker.link("German", &known));
    }

    #[test]
    fn test_link_all_preserves_candidate_order() {
        let linker = EntityLinker::new(75.0, 2);
        let known = names(&["Germany", "Lithuania"]);
        let candidates = names(&["Lithuania", "Germany"]);

        let results = linker.link_all(&candidates, &known);
        assert_eq!(results[0].0, "Lithuania");
        assert_eq!(results[1].0, "Germany");
    }

    #[test]
    fn test_limit_matches_no_duplicate_names() {
        let results = vec![
            (
                "Germany".to_string(),
                vec![("Germany".to_string(), 95.0), ("Germania".to_string(), 80.0)],
            ),
            (
                "germany team".to_string(),
                vec![("Germany".to_string(), 85.0)],
            ),
        ];

        let matched = limit_matches(&results, 3, 10);
        let names: Vec<&str> = matched.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Germany", "Germania"]);
        // First-seen score wins
        assert_eq!(matched[0].confidence, 95.0);
    }

    #[test]
    fn test_limit_matches_caps_per_candidate_and_total() {
        let results = vec![(
            "x".to_string(),
            vec![
                ("A".to_string(), 90.0),
                ("B".to_string(), 89.0),
                ("C".to_string(), 88.0),
                ("D".to_string(), 87.0),
            ],
        )];

        assert_eq!(limit_matches(&results, 3, 10).len(), 3);
        assert_eq!(limit_matches(&results, 4, 2).len(), 2);
    }

    #[test]
    fn test_limit_matches_ranked_by_confidence() {
        let results = vec![
            ("a".to_string(), vec![("Low".to_string(), 76.0)]),
            ("b".to_string(), vec![("High".to_string(), 99.0)]),
        ];

        let matched = limit_matches(&results, 3, 10);
        assert_eq!(matched[0].name, "High");
        assert_eq!(matched[1].name, "Low");
    }
}
