use super::{IndexError, SearchResult, VectorIndex};

/// Guards the denominator against zero-norm vectors.
const EPSILON: f32 = 1e-8;

/// Cosine similarity `dot / (|a| * |b| + ε)`, clamped to `[-1, 1]` to absorb
/// rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, IndexError> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON)).clamp(-1.0, 1.0))
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

impl VectorIndex {
    /// Exact top-k search by cosine similarity.
    ///
    /// Results are ordered by descending score; equal scores keep insertion
    /// order. An empty query, an empty index or `top_k == 0` yields no results.
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, IndexError> {
        if query_vector.is_empty() || top_k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored = Vec::with_capacity(self.records.len());
        for (position, record) in self.records.iter().enumerate() {
            let score = cosine_similarity(query_vector, &record.vector)?;
            scored.push((position, score));
        }

        // Stable sort keeps insertion order among ties; NaN ranks last.
        scored.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let record = &self.records[position];
                SearchResult {
                    score,
                    reference: record.reference.clone(),
                    content: record.content.clone(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EmbeddingRecord;

    fn index_with(vectors: &[(&str, Vec<f32>)]) -> VectorIndex {
        let mut index = VectorIndex::new();
        index
            .add(
                vectors
                    .iter()
                    .map(|(name, v)| EmbeddingRecord::new(*name, format!("content of {name}"), v.clone()))
                    .collect(),
            )
            .unwrap();
        index
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [0.3, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-5, "got {sim}");
    }

    #[test]
    fn test_cosine_bounds() {
        let samples: [[f32; 3]; 5] = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.2, 0.7, -0.4],
            [100.0, -3.0, 8.0],
            [1e-3, 1e-3, 1e-3],
        ];
        for a in &samples {
            for b in &samples {
                let sim = cosine_similarity(a, b).unwrap();
                assert!((-1.0..=1.0).contains(&sim), "{a:?} vs {b:?} -> {sim}");
            }
        }
        let opposite = cosine_similarity(&samples[0], &samples[1]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_zero_vector_is_finite() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = index_with(&[
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("mid", vec![1.0, 1.0]),
        ]);
        let results = index.search(&[1.0, 0.0], 10).unwrap();

        let refs: Vec<&str> = results.iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(refs, vec!["near", "mid", "far"]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(results[0].content, "content of near");
    }

    #[test]
    fn test_search_order_is_total_with_nan_scores() {
        // Pushed directly: `add` refuses non-finite vectors.
        let mut index = VectorIndex::new();
        for i in 0..200 {
            let vector = if i % 3 == 0 {
                vec![f32::NAN, 1.0]
            } else {
                vec![1.0, (i % 17) as f32 / 4.0]
            };
            index
                .records
                .push(EmbeddingRecord::new(format!("r{i}"), "", vector));
        }
        index.dimensions = Some(2);

        let results = index.search(&[1.0, 0.0], 200).unwrap();
        assert_eq!(results.len(), 200);

        let finite: Vec<f32> = results
            .iter()
            .map(|r| r.score)
            .take_while(|s| !s.is_nan())
            .collect();
        assert_eq!(finite.len(), 133);
        for pair in finite.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert!(results[133..].iter().all(|r| r.score.is_nan()));
    }

    #[test]
    fn test_search_respects_top_k_and_ties() {
        let index = index_with(&[
            ("first", vec![1.0, 0.0]),
            ("second", vec![2.0, 0.0]),
            ("third", vec![3.0, 0.0]),
        ]);
        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].reference, "first");
        assert_eq!(results[1].reference, "second");
    }

    #[test]
    fn test_search_degenerate_inputs() {
        let empty = VectorIndex::new();
        assert!(empty.search(&[1.0, 0.0], 5).unwrap().is_empty());

        let index = index_with(&[("a", vec![1.0, 0.0])]);
        assert!(index.search(&[], 5).unwrap().is_empty());
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = index_with(&[("a", vec![1.0, 0.0])]);
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 5),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }
}
