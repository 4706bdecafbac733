//! Flat in-memory vector index.
//!
//! Records are appended in batches and searched by exact cosine similarity
//! over every stored vector. There is no approximate structure.
use thiserror::Error;
use tracing::{debug, info};

pub mod models;
pub mod search;

pub use models::{EmbeddingRecord, SearchResult};
pub use search::cosine_similarity;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector for {reference} contains a non-finite component")]
    NonFiniteVector { reference: String },
}

/// Append-only store of embedded chunks.
#[derive(Debug, Default)]
pub struct VectorIndex {
    records: Vec<EmbeddingRecord>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of records.
    ///
    /// Records with an empty vector are skipped. The whole batch is rejected
    /// if any vector disagrees with the dimensionality already in the index
    /// (or with the first vector of the batch when the index is empty), or
    /// if any vector holds NaN or infinity. Returns the number of records
    /// stored.
    pub fn add(&mut self, batch: Vec<EmbeddingRecord>) -> Result<usize, IndexError> {
        let mut expected = self.dimensions;
        for record in batch.iter().filter(|r| !r.vector.is_empty()) {
            if !record.vector.iter().all(|v| v.is_finite()) {
                return Err(IndexError::NonFiniteVector {
                    reference: record.reference.clone(),
                });
            }
            match expected {
                Some(dim) if dim != record.vector.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected: dim,
                        actual: record.vector.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(record.vector.len()),
            }
        }

        let before = self.records.len();
        self.records
            .extend(batch.into_iter().filter(|r| !r.vector.is_empty()));
        self.dimensions = expected;

        let added = self.records.len() - before;
        debug!("Added {added} records to vector index ({} total)", self.records.len());
        Ok(added)
    }

    /// Discard all records.
    pub fn clear(&mut self) {
        info!("Clearing vector index ({} records)", self.records.len());
        self.records.clear();
        self.dimensions = None;
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Dimensionality of stored vectors, once anything has been added.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }
}
