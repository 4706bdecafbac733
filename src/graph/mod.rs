//! Typed entity/relationship graph.
//!
//! Entities live in a single arena and are addressed by [`EntityId`]
//! everywhere: relationship endpoints and adjacency entries never hold the
//! entity itself. Every relationship is recorded twice, once in the flat
//! list and once as a transpose pair of adjacency entries (outgoing on the
//! source, incoming on the target); `add_relationship` is the only writer of
//! either.
use std::collections::HashMap;

use tracing::{debug, info};

pub mod models;
pub mod traversal;

pub use models::{
    Adjacency, AdjacencyEntry, Direction, Entity, EntityId, EntityRecord, GraphExport, GraphStats,
    Relationship, RelationshipRecord,
};

#[derive(Debug, Default, Clone)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    by_name: HashMap<String, EntityId>,
    relationships: Vec<Relationship>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from an export snapshot.
    pub fn from_export(export: GraphExport) -> Self {
        let mut graph = Self::new();
        for record in export.entities {
            graph.add_entity(record);
        }
        for rel in export.relationships {
            graph.add_relationship_by_name(
                &rel.source,
                &rel.target,
                &rel.relation_type,
                &rel.description,
                &rel.source_reference,
            );
        }
        graph
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Add an entity unless one with the same name exists.
    ///
    /// The first write wins: a later record with an existing name leaves the
    /// stored entity untouched and returns its id. Blank names are rejected.
    pub fn add_entity(&mut self, mut record: EntityRecord) -> Option<EntityId> {
        record.name = record.name.trim().to_string();
        if record.name.is_empty() {
            return None;
        }
        if let Some(&id) = self.by_name.get(&record.name) {
            return Some(id);
        }

        let id = EntityId(self.entities.len());
        self.by_name.insert(record.name.clone(), id);
        self.entities.push(Entity::from_record(record));
        Some(id)
    }

    /// Add a directed relationship between two existing entities.
    ///
    /// Returns `false` when either id is unknown or the same
    /// (source, target, type) edge is already present.
    pub fn add_relationship(
        &mut self,
        source: EntityId,
        target: EntityId,
        relation_type: &str,
        description: &str,
        source_reference: &str,
    ) -> bool {
        if source.0 >= self.entities.len() || target.0 >= self.entities.len() {
            return false;
        }

        let exists = self.entities[source.0]
            .outgoing
            .get(relation_type)
            .is_some_and(|edges| edges.iter().any(|e| e.neighbor == target));
        if exists {
            return false;
        }

        self.entities[source.0]
            .outgoing
            .entry(relation_type.to_string())
            .or_default()
            .push(AdjacencyEntry {
                neighbor: target,
                relation_type: relation_type.to_string(),
                description: description.to_string(),
            });
        self.entities[target.0]
            .incoming
            .entry(relation_type.to_string())
            .or_default()
            .push(AdjacencyEntry {
                neighbor: source,
                relation_type: relation_type.to_string(),
                description: description.to_string(),
            });
        self.relationships.push(Relationship {
            source,
            target,
            relation_type: relation_type.to_string(),
            description: description.to_string(),
            source_reference: source_reference.to_string(),
        });

        debug!(
            "Added relationship {} -[{relation_type}]-> {}",
            self.entities[source.0].name, self.entities[target.0].name
        );
        true
    }

    /// Same as [`add_relationship`](Self::add_relationship) with endpoints
    /// looked up by name. Unknown names make this a no-op.
    pub fn add_relationship_by_name(
        &mut self,
        source: &str,
        target: &str,
        relation_type: &str,
        description: &str,
        source_reference: &str,
    ) -> bool {
        match (self.entity_id(source.trim()), self.entity_id(target.trim())) {
            (Some(s), Some(t)) => {
                self.add_relationship(s, t, relation_type, description, source_reference)
            }
            _ => false,
        }
    }

    /// Discard all entities and relationships.
    pub fn clear(&mut self) {
        info!(
            "Clearing entity graph ({} entities, {} relationships)",
            self.entities.len(),
            self.relationships.len()
        );
        self.entities.clear();
        self.by_name.clear();
        self.relationships.clear();
    }

    // ── Lookup ───────────────────────────────────────────────────────

    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entity_id(name).map(|id| &self.entities[id.0])
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Relationships in insertion order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            entities: self.entities.len(),
            relationships: self.relationships.len(),
            ..GraphStats::default()
        };
        for entity in &self.entities {
            *stats
                .entity_types
                .entry(entity.entity_type.clone())
                .or_insert(0) += 1;
        }
        for rel in &self.relationships {
            *stats
                .relationship_types
                .entry(rel.relation_type.clone())
                .or_insert(0) += 1;
        }
        stats
    }

    /// Snapshot in name form, suitable for serialization.
    pub fn export(&self) -> GraphExport {
        GraphExport {
            entities: self
                .entities
                .iter()
                .map(|e| EntityRecord {
                    name: e.name.clone(),
                    entity_type: e.entity_type.clone(),
                    attributes: e.attributes.clone(),
                    source_reference: e.source_reference.clone(),
                })
                .collect(),
            relationships: self
                .relationships
                .iter()
                .map(|r| RelationshipRecord {
                    source: self.entities[r.source.0].name.clone(),
                    target: self.entities[r.target.0].name.clone(),
                    relation_type: r.relation_type.clone(),
                    description: r.description.clone(),
                    source_reference: r.source_reference.clone(),
                })
                .collect(),
        }
    }
}
