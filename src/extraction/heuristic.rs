//! Offline extraction provider.
//!
//! Picks capitalized words, `@handles`, `#tags` and tokens containing digits
//! as entities and links each to the next one found with a `co_occurs`
//! relationship. Useful without network access and in tests.
use std::collections::HashSet;

use serde_json::json;

use super::{ExtractionError, ExtractionProvider};

const STOPWORDS: &[&str] = &[
    "and", "or", "but", "the", "a", "an", "of", "in", "on", "for", "to", "with", "this", "that",
    "these", "those", "it", "is", "are", "was", "were", "when", "then", "there",
];

#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    stopwords: HashSet<String>,
    min_len: usize,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self {
            stopwords: STOPWORDS.iter().map(|w| w.to_string()).collect(),
            min_len: 3,
        }
    }

    /// Candidate entity names in first-seen order, deduplicated
    /// case-insensitively. The first surface form is kept.
    pub fn candidates<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for raw in text.split_whitespace() {
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '#');
            if token.chars().count() < self.min_len {
                continue;
            }
            let normalized = token.to_lowercase();
            if self.stopwords.contains(&normalized) {
                continue;
            }

            let is_candidate = token.chars().next().is_some_and(char::is_uppercase)
                || token.starts_with('@')
                || token.starts_with('#')
                || token.chars().any(|c| c.is_ascii_digit());
            if is_candidate && seen.insert(normalized) {
                found.push(token);
            }
        }
        found
    }
}

fn classify(token: &str) -> &'static str {
    if token.starts_with('@') {
        "handle"
    } else if token.starts_with('#') {
        "tag"
    } else if token.chars().any(|c| c.is_ascii_digit()) {
        "identifier"
    } else {
        "name"
    }
}

impl ExtractionProvider for HeuristicExtractor {
    fn extract(&self, text: &str) -> Result<String, ExtractionError> {
        let names = self.candidates(text);

        let entities: Vec<_> = names
            .iter()
            .map(|name| json!({ "name": name, "type": classify(name) }))
            .collect();
        let relationships: Vec<_> = names
            .windows(2)
            .map(|pair| {
                json!({
                    "source": pair[0],
                    "target": pair[1],
                    "type": "co_occurs",
                    "description": "mentioned next to each other",
                })
            })
            .collect();

        serde_json::to_string(&json!({ "entities": entities, "relationships": relationships }))
            .map_err(|e| ExtractionError::Provider(e.to_string()))
    }
}
