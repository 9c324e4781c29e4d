//! Candidate entity extraction from query text
//!
//! Rule-based linguistic pass combining four detectors: multi-token phrase
//! runs, gazetteer-backed named-entity spans, single proper nouns, and a
//! regex fallback over capitalized word runs. Each detector filters
//! stopwords, punctuation-only tokens and tokens below the minimum length.
//! Results are unioned, deduplicated by stemmed form and title-cased for
//! comparison against the graph's stored names.
//!
//! Extraction is deterministic: identical input yields the identical
//! candidate list. No side effects.

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

use crate::constants::MIN_TOKEN_LEN;
use crate::store::canonical_name;

/// Rule-based candidate extractor
pub struct CandidateExtractor {
    /// Common words that are never entities, even capitalized at sentence start
    stop_words: HashSet<&'static str>,

    /// Lowercase terms known to name entities even without capitalization
    known_terms: HashSet<&'static str>,

    /// Capitalized word runs, e.g. "New York City"
    capitalized_run: Regex,
}

/// Articles, pronouns, auxiliaries, question words and other query glue.
/// Capitalized occurrences of these at sentence start are not entities.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "some", "any", "each", "every", "i", "we",
    "you", "he", "she", "it", "they", "them", "his", "her", "its", "their", "our", "your", "my",
    "me", "us", "is", "are", "was", "were", "be", "been", "being", "am", "have", "has", "had",
    "do", "does", "did", "done", "will", "would", "can", "could", "should", "shall", "may",
    "might", "must", "if", "when", "where", "what", "which", "who", "whom", "whose", "why", "how",
    "and", "or", "but", "nor", "not", "no", "yes", "of", "in", "on", "at", "to", "from", "by",
    "with", "about", "into", "onto", "over", "under", "between", "through", "during", "before",
    "after", "for", "as", "than", "then", "there", "here", "also", "very", "just", "only", "both",
    "more", "most", "less", "least", "other", "such", "own", "same", "so", "too", "tell", "show",
    "explain", "describe", "list", "give", "find", "know", "mean", "happen", "happened", "many",
    "much",
];

/// Lowercase gazetteer: terms that name graph entities without capitalization
/// in informal query text ("does germany play in eurobasket"). Kept small and
/// domain-neutral; the capitalization detectors do the heavy lifting.
const KNOWN_TERMS: &[&str] = &[
    // Technology
    "rust", "python", "java", "javascript", "typescript", "docker", "kubernetes", "mongodb",
    "postgresql", "redis", "kafka", "graphql", "linux", "react",
    // Organizations
    "google", "microsoft", "apple", "amazon", "meta", "nasa", "openai", "ibm", "intel", "nvidia",
    // Locations
    "europe", "asia", "africa", "america", "germany", "france", "india", "china", "japan",
    "london", "paris", "berlin", "tokyo",
];

impl CandidateExtractor {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            known_terms: KNOWN_TERMS.iter().copied().collect(),
            // Compiled once; the pattern is a constant
            capitalized_run: Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*\b")
                .expect("capitalized-run pattern is valid"),
        }
    }

    /// Extract candidate entity names from text, title-cased and sorted
    ///
    /// Empty or whitespace-only input yields an empty list, never an error.
    pub fn extract(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            tracing::debug!("Empty text provided for candidate extraction");
            return Vec::new();
        }

        let mut raw: Vec<String> = Vec::new();
        raw.extend(self.phrase_runs(text));
        raw.extend(self.known_term_spans(text));
        raw.extend(self.single_proper_nouns(text));
        raw.extend(self.capitalized_fallback(text));

        // Dedupe by stemmed lowercase form so "conversation" and
        // "conversations" collapse to one candidate, first detector wins.
        let stemmer = Stemmer::create(Algorithm::English);
        let mut seen = HashSet::new();
        let mut candidates: Vec<String> = Vec::new();
        for candidate in raw {
            let key = stem_phrase(&stemmer, &candidate);
            if seen.insert(key) {
                candidates.push(canonical_name(&candidate));
            }
        }

        candidates.sort();
        candidates.dedup();

        tracing::debug!("Extracted {} candidates: {:?}", candidates.len(), candidates);
        candidates
    }

    /// Detector 1: runs of two or more adjacent valid tokens
    ///
    /// Approximates noun phrases without a POS tagger; runs break at
    /// stopwords and punctuation, so query glue never joins a phrase.
    fn phrase_runs(&self, text: &str) -> Vec<String> {
        let mut phrases = Vec::new();
        let mut run: Vec<&str> = Vec::new();

        for token in text.split_whitespace() {
            let cleaned = trim_token(token);
            if self.is_valid_token(cleaned) {
                run.push(cleaned);
            } else {
                self.flush_run(&mut run, &mut phrases);
            }
            // Punctuation inside the original token ends the phrase too
            if token.ends_with(['.', ',', '!', '?', ';', ':']) {
                self.flush_run(&mut run, &mut phrases);
            }
        }
        self.flush_run(&mut run, &mut phrases);
        phrases
    }

    fn flush_run(&self, run: &mut Vec<&str>, phrases: &mut Vec<String>) {
        if run.len() >= 2 && run.len() <= 4 {
            phrases.push(run.join(" "));
        }
        run.clear();
    }

    /// Detector 2: gazetteer spans, matched case-insensitively
    ///
    /// Checks bigrams before unigrams so "new york" wins over "york".
    fn known_term_spans(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().map(trim_token).collect();
        let mut found = Vec::new();
        let mut skip_next = false;

        for (i, token) in tokens.iter().enumerate() {
            if skip_next {
                skip_next = false;
                continue;
            }
            if i + 1 < tokens.len() {
                let bigram = format!("{} {}", token.to_lowercase(), tokens[i + 1].to_lowercase());
                if self.known_terms.contains(bigram.as_str()) {
                    found.push(bigram);
                    skip_next = true;
                    continue;
                }
            }
            let lower = token.to_lowercase();
            if self.known_terms.contains(lower.as_str()) {
                found.push(lower);
            }
        }
        found
    }

    /// Detector 3: single capitalized tokens that look like proper nouns
    ///
    /// A capitalized word mid-sentence is evidence; at sentence start it only
    /// counts when it is not ordinary query glue.
    fn single_proper_nouns(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut found = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let cleaned = trim_token(token);
            if !self.is_valid_token(cleaned) {
                continue;
            }
            if !cleaned.chars().next().is_some_and(|c| c.is_uppercase()) {
                continue;
            }

            let sentence_start =
                i == 0 || tokens[i - 1].ends_with(['.', '!', '?']);
            if sentence_start && self.stop_words.contains(cleaned.to_lowercase().as_str()) {
                continue;
            }
            found.push(cleaned.to_string());
        }
        found
    }

    /// Detector 4: regex fallback over capitalized word runs
    ///
    /// Catches spans the token-based detectors miss, e.g. runs straddling
    /// commas stripped by `trim_token`.
    fn capitalized_fallback(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();

        for m in self.capitalized_run.find_iter(text) {
            let words: Vec<&str> = m
                .as_str()
                .split_whitespace()
                .map(trim_token)
                .filter(|w| self.is_valid_token(w))
                .collect();

            match words.len() {
                0 => {}
                1 => found.push(words[0].to_string()),
                _ => found.push(words.join(" ")),
            }
        }
        found
    }

    /// Token filter shared by all detectors: minimum length, no stopwords,
    /// must contain at least one alphanumeric character
    fn is_valid_token(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        lower.len() >= MIN_TOKEN_LEN
            && !self.stop_words.contains(lower.as_str())
            && token.chars().any(|c| c.is_alphanumeric())
    }
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip surrounding punctuation from a whitespace token
fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Stem every word of a phrase for duplicate detection
fn stem_phrase(stemmer: &Stemmer, phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| stemmer.stem(&word.to_lowercase()).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
