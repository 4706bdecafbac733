//! Read-only analytics over an [`EntityGraph`](crate::graph::EntityGraph)
//! snapshot: community detection and per-community cluster statistics.
//!
//! Both work on the undirected simple projection of the graph: two entities
//! are linked when any relationship joins them in either direction, and
//! self-relationships are ignored.
pub mod clusters;
pub mod communities;

pub use clusters::{Cluster, generate_clusters};
pub use communities::{CommunityAssignment, detect_communities};

use crate::graph::{Direction, EntityGraph, EntityId};

/// Undirected neighbour lists indexed by arena position.
pub(crate) fn undirected_adjacency(graph: &EntityGraph) -> Vec<Vec<usize>> {
    (0..graph.len())
        .map(|i| {
            graph
                .neighbor_ids(EntityId(i), Direction::Both, None)
                .into_iter()
                .map(EntityId::index)
                .filter(|&n| n != i)
                .collect()
        })
        .collect()
}

/// Number of distinct undirected links.
pub(crate) fn edge_count(adjacency: &[Vec<usize>]) -> usize {
    adjacency.iter().map(Vec::len).sum::<usize>() / 2
}
