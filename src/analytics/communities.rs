use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use super::{edge_count, undirected_adjacency};
use crate::graph::EntityGraph;

/// Result of a community detection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommunityAssignment {
    /// Entity name to dense community id.
    pub communities: HashMap<String, usize>,
    pub community_count: usize,
    pub modularity: f64,
}

impl CommunityAssignment {
    pub fn community_of(&self, name: &str) -> Option<usize> {
        self.communities.get(name).copied()
    }
}

/// Greedy single-level community detection.
///
/// Every entity starts alone. Each pass visits entities in insertion order
/// and moves an entity to the neighbouring community holding the most of its
/// links, when that beats the links it has in its current community; the
/// gain is `(target − current) / total_edges`. Ties between candidate
/// communities go to the one met first. Passes repeat until nothing moves.
/// Ids are then relabelled densely in first-encounter order.
pub fn detect_communities(graph: &EntityGraph) -> CommunityAssignment {
    let adjacency = undirected_adjacency(graph);
    let total_edges = edge_count(&adjacency);
    let mut community: Vec<usize> = (0..adjacency.len()).collect();

    if total_edges > 0 {
        let mut pass = 0;
        loop {
            pass += 1;
            let moved = run_pass(&adjacency, &mut community, total_edges);
            debug!("Community pass {pass}: {moved} moves");
            if moved == 0 {
                break;
            }
        }
    }

    let labels = relabel(&community);
    let community_count = labels.iter().max().map_or(0, |max| max + 1);
    let modularity = if total_edges == 0 {
        0.0
    } else {
        modularity(&adjacency, &labels, community_count, total_edges)
    };

    info!(
        "Detected {community_count} communities over {} entities (modularity {modularity:.4})",
        graph.len()
    );

    CommunityAssignment {
        communities: graph
            .entities()
            .iter()
            .zip(&labels)
            .map(|(entity, &label)| (entity.name.clone(), label))
            .collect(),
        community_count,
        modularity,
    }
}

/// One sweep over all nodes. Returns how many moved.
fn run_pass(adjacency: &[Vec<usize>], community: &mut [usize], total_edges: usize) -> usize {
    let mut moved = 0;
    for node in 0..adjacency.len() {
        let current = community[node];

        // Links per neighbouring community, in first-seen order.
        let mut links: Vec<(usize, usize)> = Vec::new();
        for &neighbor in &adjacency[node] {
            let c = community[neighbor];
            match links.iter_mut().find(|(k, _)| *k == c) {
                Some(entry) => entry.1 += 1,
                None => links.push((c, 1)),
            }
        }

        let current_links = links
            .iter()
            .find(|(c, _)| *c == current)
            .map_or(0, |(_, n)| *n);

        let mut best: Option<(usize, usize)> = None;
        for &(c, n) in links.iter().filter(|(c, _)| *c != current) {
            if best.is_none_or(|(_, best_n)| n > best_n) {
                best = Some((c, n));
            }
        }

        if let Some((target, target_links)) = best {
            let gain = (target_links as f64 - current_links as f64) / total_edges as f64;
            if gain > 0.0 {
                community[node] = target;
                moved += 1;
            }
        }
    }
    moved
}

/// Dense 0-based labels in first-encounter order.
fn relabel(community: &[usize]) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    community
        .iter()
        .map(|c| {
            let next = mapping.len();
            *mapping.entry(*c).or_insert(next)
        })
        .collect()
}

/// `Σ_c [ internal_c / m − (Σ degree_c)² / (4m²) ]`.
fn modularity(
    adjacency: &[Vec<usize>],
    labels: &[usize],
    community_count: usize,
    total_edges: usize,
) -> f64 {
    let m = total_edges as f64;
    let mut internal = vec![0usize; community_count];
    let mut degree = vec![0usize; community_count];

    for (node, neighbors) in adjacency.iter().enumerate() {
        let c = labels[node];
        degree[c] += neighbors.len();
        // Count each link from its lower end only.
        internal[c] += neighbors
            .iter()
            .filter(|&&n| n > node && labels[n] == c)
            .count();
    }

    internal
        .iter()
        .zip(&degree)
        .map(|(&l, &d)| l as f64 / m - (d as f64).powi(2) / (4.0 * m * m))
        .sum()
}
