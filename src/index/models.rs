use serde::Serialize;

/// A chunk paired with its embedding, owned by the index once added.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub reference: String,
    pub content: String,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn new(reference: impl Into<String>, content: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            reference: reference.into(),
            content: content.into(),
            vector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub score: f32,
    pub reference: String,
    pub content: String,
}
