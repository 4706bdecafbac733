/// Embedding provider seam.
///
/// The core never computes embeddings itself; it calls an [`Embedder`] and
/// treats a failure or an empty vector as "skip this item".
pub mod mock;

use thiserror::Error;

pub use mock::MockEmbedder;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`. Calls may block; the ingestion path runs them on the
/// blocking pool.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector. An empty vector means the
    /// provider had nothing for this text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
