use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::graph::{EntityGraph, GraphStats};
use crate::index::VectorIndex;

/// Shared handle to the vector index and the entity graph.
///
/// Constructed once and cloned into every call site; clones share state.
/// Each store sits behind its own read/write lock, so ingestion writes never
/// overlap with query reads on the same store.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    pub index: Arc<RwLock<VectorIndex>>,
    pub graph: Arc<RwLock<EntityGraph>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub chunks: usize,
    pub dimensions: Option<usize>,
    pub graph: GraphStats,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session reset: discard every indexed chunk, entity and relationship.
    pub async fn clear(&self) {
        self.index.write().await.clear();
        self.graph.write().await.clear();
        info!("Knowledge store cleared");
    }

    pub async fn stats(&self) -> StoreStats {
        let (chunks, dimensions) = {
            let index = self.index.read().await;
            (index.len(), index.dimensions())
        };
        StoreStats {
            chunks,
            dimensions,
            graph: self.graph.read().await.stats(),
        }
    }
}
