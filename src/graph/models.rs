use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Position of an entity in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Entity fields as supplied by a caller or an extraction payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EntityRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub source_reference: String,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: impl Into<String>) -> Self {
        self.attributes = attributes.into();
        self
    }

    pub fn with_source(mut self, source_reference: impl Into<String>) -> Self {
        self.source_reference = source_reference.into();
        self
    }
}

/// One side of a relationship as seen from an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyEntry {
    pub neighbor: EntityId,
    pub relation_type: String,
    pub description: String,
}

/// Adjacency grouped by relation type.
pub type Adjacency = BTreeMap<String, Vec<AdjacencyEntry>>;

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    pub attributes: String,
    pub source_reference: String,
    pub(crate) outgoing: Adjacency,
    pub(crate) incoming: Adjacency,
}

impl Entity {
    pub(crate) fn from_record(record: EntityRecord) -> Self {
        Self {
            name: record.name,
            entity_type: record.entity_type,
            attributes: record.attributes,
            source_reference: record.source_reference,
            outgoing: Adjacency::new(),
            incoming: Adjacency::new(),
        }
    }

    pub fn outgoing(&self) -> &Adjacency {
        &self.outgoing
    }

    pub fn incoming(&self) -> &Adjacency {
        &self.incoming
    }
}

/// Directed, typed edge between two arena entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub relation_type: String,
    pub description: String,
    pub source_reference: String,
}

/// Which adjacency side a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entities: usize,
    pub relationships: usize,
    pub entity_types: BTreeMap<String, usize>,
    pub relationship_types: BTreeMap<String, usize>,
}

/// Relationship in name form, for export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_reference: String,
}

/// Serializable snapshot of a graph. Replaying it through
/// `EntityGraph::from_export` rebuilds the adjacency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphExport {
    pub entities: Vec<EntityRecord>,
    pub relationships: Vec<RelationshipRecord>,
}
