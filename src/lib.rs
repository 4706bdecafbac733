//! # docgraph: in-memory knowledge-retrieval core
//!
//! Turns raw text into reference-tagged chunks, indexes them for exact
//! cosine search, and builds a typed entity/relationship graph over the same
//! corpus that can be traversed and clustered into communities.
//!
//! ## Architecture
//!
//! - **[`segmenter`]**: Token-bounded sliding-window chunking with per-extension line filters
//! - **[`index`]**: Flat vector index with brute-force cosine search
//! - **[`graph`]**: Arena-backed entity graph with transpose adjacency and BFS traversal
//! - **[`analytics`]**: Greedy community detection and cluster statistics
//! - **[`embedder`]**: Embedding provider trait plus a deterministic mock
//! - **[`extraction`]**: Extraction provider trait, payload parsing, offline heuristic provider
//! - **[`retrieval`]**: Shared store, concurrent ingestion, mean-filtered queries
//! - **[`config`]**: Configuration loading and validation

pub mod analytics;
pub mod config;
pub mod embedder;
pub mod extraction;
pub mod graph;
pub mod index;
pub mod retrieval;
pub mod segmenter;
