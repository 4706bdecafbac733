use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{CommunityAssignment, undirected_adjacency};
use crate::graph::EntityGraph;

/// How many relationship types a cluster summary keeps.
const TOP_RELATIONSHIP_TYPES: usize = 3;

/// Read-only summary of one community.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: usize,
    /// Member names in graph insertion order.
    pub member_names: Vec<String>,
    pub entity_type_counts: BTreeMap<String, usize>,
    /// Internal links over possible links, `0` for fewer than two members.
    pub density: f64,
    /// Most frequent relationship types among relationships with both ends
    /// inside the cluster, most frequent first.
    pub top_relationship_types: Vec<String>,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.member_names.len()
    }
}

/// Group entities by community and summarize each group. Largest clusters
/// come first; equal sizes keep ascending id order. Entities missing from the
/// assignment are left out.
pub fn generate_clusters(graph: &EntityGraph, assignment: &CommunityAssignment) -> Vec<Cluster> {
    let labels: Vec<Option<usize>> = graph
        .entities()
        .iter()
        .map(|e| assignment.community_of(&e.name))
        .collect();

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, label) in labels.iter().enumerate() {
        if let Some(c) = label {
            members.entry(*c).or_default().push(node);
        }
    }

    let adjacency = undirected_adjacency(graph);
    let mut internal_links: HashMap<usize, usize> = HashMap::new();
    for (node, neighbors) in adjacency.iter().enumerate() {
        let Some(c) = labels[node] else { continue };
        let count = neighbors
            .iter()
            .filter(|&&n| n > node && labels[n] == Some(c))
            .count();
        *internal_links.entry(c).or_insert(0) += count;
    }

    let mut type_frequency: HashMap<usize, HashMap<&str, usize>> = HashMap::new();
    for rel in graph.relationships() {
        let (Some(a), Some(b)) = (labels[rel.source.index()], labels[rel.target.index()]) else {
            continue;
        };
        if a == b {
            *type_frequency
                .entry(a)
                .or_default()
                .entry(rel.relation_type.as_str())
                .or_insert(0) += 1;
        }
    }

    let entities = graph.entities();
    let mut clusters: Vec<Cluster> = members
        .into_iter()
        .map(|(id, nodes)| {
            let n = nodes.len();
            let mut entity_type_counts = BTreeMap::new();
            for &node in &nodes {
                *entity_type_counts
                    .entry(entities[node].entity_type.clone())
                    .or_insert(0) += 1;
            }

            let density = if n < 2 {
                0.0
            } else {
                let possible = (n * (n - 1) / 2) as f64;
                internal_links.get(&id).copied().unwrap_or(0) as f64 / possible
            };

            let mut ranked: Vec<(&str, usize)> = type_frequency
                .remove(&id)
                .map(|freq| freq.into_iter().collect())
                .unwrap_or_default();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

            Cluster {
                id,
                member_names: nodes.iter().map(|&i| entities[i].name.clone()).collect(),
                entity_type_counts,
                density,
                top_relationship_types: ranked
                    .into_iter()
                    .take(TOP_RELATIONSHIP_TYPES)
                    .map(|(kind, _)| kind.to_string())
                    .collect(),
            }
        })
        .collect();

    // Stable: ids are already ascending.
    clusters.sort_by(|a, b| b.size().cmp(&a.size()));
    clusters
}
