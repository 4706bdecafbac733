//! Entity/relationship extraction seam.
//!
//! A provider returns a loosely structured JSON payload
//! `{ entities: [{name, type, attributes}], relationships: [{source, target, type, description}] }`.
//! Key case is ignored, surrounding prose or code fences are tolerated, and
//! anything that still fails to parse is reported as
//! [`ExtractionError::Malformed`] for the caller to skip.
pub mod heuristic;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use heuristic::HeuristicExtractor;

use crate::graph::{EntityGraph, EntityRecord};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("extraction provider failed: {0}")]
    Provider(String),

    #[error("malformed extraction payload: {0}")]
    Malformed(String),
}

/// Source of extraction payloads, typically a language model.
pub trait ExtractionProvider: Send + Sync {
    /// Raw payload for `text`.
    fn extract(&self, text: &str) -> Result<String, ExtractionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: String,
    pub attributes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedRelationship {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionPayload {
    pub entities: Vec<ExtractedEntity>,
    pub relationships: Vec<ExtractedRelationship>,
}

// Wire shapes, read after keys are lowercased.
#[derive(Deserialize, Default)]
struct RawPayload {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default, alias = "relations")]
    relationships: Vec<RawRelationship>,
}

#[derive(Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: Value,
    #[serde(default, rename = "type")]
    entity_type: Value,
    #[serde(default)]
    attributes: Value,
}

#[derive(Deserialize)]
struct RawRelationship {
    #[serde(default)]
    source: Value,
    #[serde(default)]
    target: Value,
    #[serde(default, rename = "type")]
    relation_type: Value,
    #[serde(default)]
    description: Value,
}

/// Parse a provider payload.
pub fn parse_extraction(raw: &str) -> Result<ExtractionPayload, ExtractionError> {
    let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(ExtractionError::Malformed("no JSON object found".to_string()));
    };
    if close < open {
        return Err(ExtractionError::Malformed("no JSON object found".to_string()));
    }

    let value: Value = serde_json::from_str(&raw[open..=close])
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;
    let payload: RawPayload = serde_json::from_value(lowercase_keys(value))
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    Ok(ExtractionPayload {
        entities: payload
            .entities
            .into_iter()
            .map(|e| ExtractedEntity {
                name: flatten(e.name),
                entity_type: flatten(e.entity_type),
                attributes: flatten(e.attributes),
            })
            .filter(|e| !e.name.is_empty())
            .collect(),
        relationships: payload
            .relationships
            .into_iter()
            .map(|r| ExtractedRelationship {
                source: flatten(r.source),
                target: flatten(r.target),
                relation_type: flatten(r.relation_type),
                description: flatten(r.description),
            })
            .filter(|r| !r.source.is_empty() && !r.target.is_empty())
            .collect(),
    })
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Render any JSON value as trimmed text; strings lose their quotes.
fn flatten(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Counts from applying one payload to a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub entities_added: usize,
    pub relationships_added: usize,
    pub relationships_skipped: usize,
}

/// Write a payload into the graph: entities first, then relationships by
/// name. Relationships naming unknown entities, or repeating an existing
/// edge, are skipped.
pub fn apply_extraction(
    graph: &mut EntityGraph,
    payload: &ExtractionPayload,
    source_reference: &str,
) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for entity in &payload.entities {
        let before = graph.len();
        let record = EntityRecord::new(entity.name.as_str(), entity.entity_type.as_str())
            .with_attributes(entity.attributes.as_str())
            .with_source(source_reference);
        if graph.add_entity(record).is_some() && graph.len() > before {
            stats.entities_added += 1;
        }
    }

    for rel in &payload.relationships {
        if graph.add_relationship_by_name(
            &rel.source,
            &rel.target,
            &rel.relation_type,
            &rel.description,
            source_reference,
        ) {
            stats.relationships_added += 1;
        } else {
            stats.relationships_skipped += 1;
        }
    }

    debug!(
        "Applied extraction from {source_reference}: +{} entities, +{} relationships, {} skipped",
        stats.entities_added, stats.relationships_added, stats.relationships_skipped
    );
    stats
}
