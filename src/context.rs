//! Context assembly for the downstream answer generator
//!
//! Turns retrieved facts and matched entities into one text block: a
//! relationships section listing each triple, then an entity-descriptions
//! section annotated with match confidence. Either section is omitted when
//! it has nothing to show, and the whole block collapses to an empty string
//! when both are empty so callers can test for "no enhancement available".

use std::collections::HashSet;
use std::sync::Arc;

use crate::store::{Fact, GraphStore, MatchedEntity};

const RELATIONSHIPS_HEADER: &str = "=== RELEVANT RELATIONSHIPS ===";
const DESCRIPTIONS_HEADER: &str = "=== ENTITY DESCRIPTIONS ===";

pub struct ContextAssembler {
    store: Arc<dyn GraphStore>,
}

impl ContextAssembler {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Format facts and matched entities into the context block
    ///
    /// Entities without a stored description are skipped, as is any entity
    /// already rendered. Store lookup failures are logged and treated as
    /// "no description".
    pub fn assemble(&self, facts: &[Fact], matched: &[MatchedEntity]) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !facts.is_empty() {
            parts.push(RELATIONSHIPS_HEADER.to_string());
            for fact in facts {
                parts.push(format!("- {} {} {}", fact.subject, fact.predicate, fact.object));
            }
        }

        let mut descriptions: Vec<String> = Vec::new();
        let mut rendered: HashSet<&str> = HashSet::new();
        for m in matched {
            if !rendered.insert(m.name.as_str()) {
                continue;
            }
            match self.store.entity_by_name(&m.name) {
                Ok(Some(entity)) if !entity.description.trim().is_empty() => {
                    descriptions.push(format!("**{}** ({:.1}%)", entity.name, m.confidence));
                    descriptions.push(entity.description.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Entity lookup failed for '{}': {}", m.name, e);
                }
            }
        }

        if !descriptions.is_empty() {
            if !parts.is_empty() {
                parts.push(String::new());
            }
            parts.push(DESCRIPTIONS_HEADER.to_string());
            parts.extend(descriptions);
        }

        let context = parts.join("\n");
        tracing::debug!(
            "Assembled context: {} facts, {} matched entities, {} chars",
            facts.len(),
            matched.len(),
            context.len()
        );
        context
    }
}
