//! Conversion of raw model tensors into dense, sparse and multi-vector outputs.
//!
//! Sparse extraction skips special tokens; multi-vector extraction keeps them.
//! Only the attention mask gates multi-vector rows. Keep the two paths
//! distinct.

use ndarray::{ArrayView2, ArrayView3, Axis};
use std::collections::HashMap;

/// Reserved ids excluded from lexical weights: pad, unk, start and end markers.
pub const SPECIAL_TOKEN_IDS: [i64; 4] = [0, 1, 2, 3];

pub fn is_special_token(token_id: i64) -> bool {
    SPECIAL_TOKEN_IDS.contains(&token_id)
}

/// First row of a `[1, D]` dense output.
pub fn extract_dense(dense: ArrayView2<'_, f32>) -> Vec<f32> {
    dense
        .axis_iter(Axis(0))
        .next()
        .map(|row| row.to_vec())
        .unwrap_or_default()
}

/// Token id to lexical weight from a `[1, N, H]` sparse output.
///
/// A position contributes when its mask is 1 and its id is not special. Its
/// weight is the maximum over the hidden axis, kept only if strictly
/// positive. Repeated ids keep the largest weight seen.
///
/// When the tensor's sequence axis and the token sequence disagree, the
/// shorter length wins.
pub fn extract_sparse_weights(
    sparse: ArrayView3<'_, f32>,
    token_ids: &[i64],
    attention_mask: &[i64],
) -> HashMap<i64, f32> {
    let mut weights = HashMap::new();
    let Some(batch) = sparse.axis_iter(Axis(0)).next() else {
        return weights;
    };

    let seq_len = token_ids
        .len()
        .min(attention_mask.len())
        .min(batch.len_of(Axis(0)));

    for i in 0..seq_len {
        let token_id = token_ids[i];
        if attention_mask[i] != 1 || is_special_token(token_id) {
            continue;
        }

        let max_weight = batch
            .index_axis(Axis(0), i)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        if max_weight > 0.0 {
            let entry = weights.entry(token_id).or_insert(max_weight);
            if max_weight > *entry {
                *entry = max_weight;
            }
        }
    }

    weights
}

/// Per-token vectors from a `[1, N, H]` multi-vector output, in position
/// order, for every position whose mask is 1. Special tokens are kept.
pub fn extract_multi_vectors(
    multi_vector: ArrayView3<'_, f32>,
    attention_mask: &[i64],
) -> Vec<Vec<f32>> {
    let Some(batch) = multi_vector.axis_iter(Axis(0)).next() else {
        return Vec::new();
    };

    batch
        .axis_iter(Axis(0))
        .zip(attention_mask)
        .filter(|(_, &mask)| mask == 1)
        .map(|(row, _)| row.to_vec())
        .collect()
}
