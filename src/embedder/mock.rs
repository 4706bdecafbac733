/// Deterministic offline embedder.
///
/// Hashes each lowercase word into a signed bucket, so texts sharing
/// vocabulary land close together. Good enough for tests and for running
/// the pipeline without a model.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError};

pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        if self.dimensions == 0 {
            return Err(EmbedderError::Unavailable(
                "mock embedder configured with zero dimensions".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        // L2 normalize; text without words stays the zero vector
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::cosine_similarity;

    #[test]
    fn test_mock_embed_dimensions() {
        let embedder = MockEmbedder::new(384);
        let result = embedder.embed("hello world").unwrap();
        assert_eq!(result.len(), 384);
    }

    #[test]
    fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(384);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::new(384);
        let vec = embedder.embed("test normalization").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "vector should be approximately unit length, got {norm}"
        );
    }

    #[test]
    fn test_shared_vocabulary_scores_higher() {
        let embedder = MockEmbedder::new(256);
        let query = embedder.embed("rust borrow checker").unwrap();
        let related = embedder.embed("The Rust borrow checker rejects this").unwrap();
        let unrelated = embedder.embed("banana smoothie recipe").unwrap();

        let near = cosine_similarity(&query, &related).unwrap();
        let far = cosine_similarity(&query, &unrelated).unwrap();
        assert!(near > far, "{near} <= {far}");
    }

    #[test]
    fn test_mock_embed_batch() {
        let embedder = MockEmbedder::new(128);
        let results = embedder.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(results.len(), 3);
        for vec in &results {
            assert_eq!(vec.len(), 128);
        }
    }

    #[test]
    fn test_zero_dimensions_fail() {
        assert!(MockEmbedder::new(0).embed("anything").is_err());
    }
}
