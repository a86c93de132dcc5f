//! Result records returned to callers.

use crate::config::ExecutionProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense, sparse and multi-vector representations of one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutput {
    dense_embedding: Vec<f32>,
    sparse_weights: HashMap<i64, f32>,
    multi_vectors: Vec<Vec<f32>>,
    token_ids: Vec<i64>,
}

impl EmbeddingOutput {
    pub fn new(
        dense_embedding: Vec<f32>,
        sparse_weights: HashMap<i64, f32>,
        multi_vectors: Vec<Vec<f32>>,
        token_ids: Vec<i64>,
    ) -> Self {
        Self {
            dense_embedding,
            sparse_weights,
            multi_vectors,
            token_ids,
        }
    }

    /// Sentence-level vector.
    pub fn dense_embedding(&self) -> &[f32] {
        &self.dense_embedding
    }

    /// Token id to lexical weight; every weight is strictly positive.
    pub fn sparse_weights(&self) -> &HashMap<i64, f32> {
        &self.sparse_weights
    }

    /// One vector per unmasked input position, in position order.
    pub fn multi_vectors(&self) -> &[Vec<f32>] {
        &self.multi_vectors
    }

    /// Ordered token ids fed to the model.
    pub fn token_ids(&self) -> &[i64] {
        &self.token_ids
    }

    pub fn dense_dimension(&self) -> usize {
        self.dense_embedding.len()
    }

    /// Hidden size of the multi-vector rows, if there are any.
    pub fn multi_vector_dimension(&self) -> Option<usize> {
        self.multi_vectors.first().map(Vec::len)
    }

    pub fn into_parts(self) -> (Vec<f32>, HashMap<i64, f32>, Vec<Vec<f32>>, Vec<i64>) {
        (
            self.dense_embedding,
            self.sparse_weights,
            self.multi_vectors,
            self.token_ids,
        )
    }
}

/// Providers in effect for an embedder's two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Always CPU
    pub tokenizer_provider: ExecutionProvider,
    /// Provider the model session actually runs on
    pub model_provider: ExecutionProvider,
    /// Primary provider from the configuration
    pub requested_provider: ExecutionProvider,
}

impl ProviderInfo {
    /// True when an accelerator was requested but the model runs elsewhere.
    pub fn fell_back(&self) -> bool {
        self.requested_provider != self.model_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_accessors() {
        let mut sparse = HashMap::new();
        sparse.insert(8999, 0.17f32);

        let output = EmbeddingOutput::new(
            vec![0.6, 0.8],
            sparse,
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            vec![0, 8999],
        );

        assert_eq!(output.dense_dimension(), 2);
        assert_eq!(output.multi_vector_dimension(), Some(3));
        assert_eq!(output.token_ids(), &[0, 8999]);

        let (dense, sparse, multi, ids) = output.into_parts();
        assert_eq!(dense.len(), 2);
        assert_eq!(sparse[&8999], 0.17);
        assert_eq!(multi.len(), 2);
        assert_eq!(ids, vec![0, 8999]);
    }

    #[test]
    fn test_empty_multi_vector_dimension() {
        let output = EmbeddingOutput::new(vec![0.0; 4], HashMap::new(), vec![], vec![]);
        assert_eq!(output.multi_vector_dimension(), None);
    }

    #[test]
    fn test_provider_info_fallback_detection() {
        let info = ProviderInfo {
            tokenizer_provider: ExecutionProvider::Cpu,
            model_provider: ExecutionProvider::Cpu,
            requested_provider: ExecutionProvider::Cuda,
        };
        assert!(info.fell_back());

        let direct = ProviderInfo {
            model_provider: ExecutionProvider::Cuda,
            ..info
        };
        assert!(!direct.fell_back());
    }
}
