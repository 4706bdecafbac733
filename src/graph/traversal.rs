use std::collections::{HashMap, HashSet, VecDeque};

use super::{Direction, Entity, EntityGraph, EntityId};

impl EntityGraph {
    /// Neighbour ids of `id`, deduplicated, in adjacency order (outgoing
    /// before incoming, relation types in lexical order).
    pub(crate) fn neighbor_ids(
        &self,
        id: EntityId,
        direction: Direction,
        relation_type: Option<&str>,
    ) -> Vec<EntityId> {
        let Some(entity) = self.entities.get(id.0) else {
            return Vec::new();
        };

        let sides = match direction {
            Direction::Outgoing => [Some(&entity.outgoing), None],
            Direction::Incoming => [Some(&entity.incoming), None],
            Direction::Both => [Some(&entity.outgoing), Some(&entity.incoming)],
        };

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for adjacency in sides.into_iter().flatten() {
            for (kind, edges) in adjacency {
                if relation_type.is_some_and(|wanted| wanted != kind.as_str()) {
                    continue;
                }
                for edge in edges {
                    if seen.insert(edge.neighbor) {
                        result.push(edge.neighbor);
                    }
                }
            }
        }
        result
    }

    /// Neighbours of the named entity. Unknown names yield nothing.
    pub fn neighbors(
        &self,
        name: &str,
        direction: Direction,
        relation_type: Option<&str>,
    ) -> Vec<&Entity> {
        let Some(id) = self.entity_id(name) else {
            return Vec::new();
        };
        self.neighbor_ids(id, direction, relation_type)
            .into_iter()
            .map(|n| &self.entities[n.0])
            .collect()
    }

    pub fn all_neighbors(&self, name: &str, relation_type: Option<&str>) -> Vec<&Entity> {
        self.neighbors(name, Direction::Both, relation_type)
    }

    pub fn outgoing_neighbors(&self, name: &str, relation_type: Option<&str>) -> Vec<&Entity> {
        self.neighbors(name, Direction::Outgoing, relation_type)
    }

    pub fn incoming_neighbors(&self, name: &str, relation_type: Option<&str>) -> Vec<&Entity> {
        self.neighbors(name, Direction::Incoming, relation_type)
    }

    /// Shortest path between two entities, ignoring edge direction.
    ///
    /// Breadth-first, so the first path found is minimal in edge count.
    /// Returns an empty path when either end is unknown or the target is
    /// more than `max_depth` edges away; `[from]` when `from == to`.
    pub fn shortest_path(&self, from: &str, to: &str, max_depth: usize) -> Vec<&Entity> {
        let (Some(start), Some(goal)) = (self.entity_id(from), self.entity_id(to)) else {
            return Vec::new();
        };
        if start == goal {
            return vec![&self.entities[start.0]];
        }

        let mut parent: HashMap<EntityId, EntityId> = HashMap::new();
        let mut visited = vec![false; self.entities.len()];
        let mut queue = VecDeque::new();
        visited[start.0] = true;
        queue.push_back((start, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbor_ids(current, Direction::Both, None) {
                if visited[next.0] {
                    continue;
                }
                visited[next.0] = true;
                parent.insert(next, current);
                if next == goal {
                    return self.unwind_path(goal, &parent);
                }
                queue.push_back((next, depth + 1));
            }
        }

        Vec::new()
    }

    fn unwind_path(&self, goal: EntityId, parent: &HashMap<EntityId, EntityId>) -> Vec<&Entity> {
        let mut path = vec![goal];
        let mut cursor = goal;
        while let Some(&prev) = parent.get(&cursor) {
            path.push(prev);
            cursor = prev;
        }
        path.reverse();
        path.into_iter().map(|id| &self.entities[id.0]).collect()
    }

    /// Entities reachable from `name` within `max_hops` undirected edges,
    /// paired with their hop distance, in discovery order. The origin itself
    /// is not included.
    pub fn within_hops(&self, name: &str, max_hops: usize) -> Vec<(&Entity, usize)> {
        let Some(start) = self.entity_id(name) else {
            return Vec::new();
        };

        let mut visited = vec![false; self.entities.len()];
        let mut queue = VecDeque::new();
        let mut reached = Vec::new();
        visited[start.0] = true;
        queue.push_back((start, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for next in self.neighbor_ids(current, Direction::Both, None) {
                if visited[next.0] {
                    continue;
                }
                visited[next.0] = true;
                reached.push((&self.entities[next.0], depth + 1));
                queue.push_back((next, depth + 1));
            }
        }

        reached
    }
}
