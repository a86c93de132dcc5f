//! Post-processing between the tokenizer and model sessions and the caller.
//!
//! The order is fixed: [`reorder`] builds model inputs from raw tokenizer
//! output, the model runs, then [`extract`] turns its tensors into an
//! [`EmbeddingOutput`].

pub mod extract;
pub mod reorder;

pub use extract::{
    extract_dense, extract_multi_vectors, extract_sparse_weights, is_special_token,
    SPECIAL_TOKEN_IDS,
};
pub use reorder::{reorder, reorder_tokens, OrderedTokens};

use crate::output::EmbeddingOutput;
use crate::provider::RawModelOutputs;

/// Build the caller-facing output from ordered inputs and raw model tensors.
pub fn build_output(ordered: OrderedTokens, outputs: &RawModelOutputs) -> EmbeddingOutput {
    let dense = extract_dense(outputs.dense.view());
    let sparse_weights = extract_sparse_weights(
        outputs.sparse.view(),
        &ordered.input_ids,
        &ordered.attention_mask,
    );
    let multi_vectors = extract_multi_vectors(outputs.multi_vector.view(), &ordered.attention_mask);

    EmbeddingOutput::new(dense, sparse_weights, multi_vectors, ordered.input_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RawTokenization;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_build_output_end_to_end() {
        // Tokenizer emitted "<s> hello world </s>" out of order
        let raw = RawTokenization::new(vec![33600, 0, 2, 8999], vec![1, 0, 3, 2]);
        let ordered = reorder(&raw);
        assert_eq!(ordered.input_ids, vec![0, 33600, 8999, 2]);

        let outputs = RawModelOutputs {
            dense: Array2::from_shape_vec((1, 2), vec![0.6, 0.8]).unwrap(),
            sparse: Array3::from_shape_vec((1, 4, 1), vec![0.3, 0.21, 0.17, 0.05]).unwrap(),
            multi_vector: Array3::from_shape_vec(
                (1, 4, 2),
                vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5, 0.2, 0.8],
            )
            .unwrap(),
        };

        let output = build_output(ordered, &outputs);
        assert_eq!(output.dense_embedding(), &[0.6, 0.8]);
        assert_eq!(output.token_ids(), &[0, 33600, 8999, 2]);
        assert_eq!(output.sparse_weights().len(), 2);
        assert_eq!(output.sparse_weights()[&33600], 0.21);
        assert_eq!(output.sparse_weights()[&8999], 0.17);
        assert_eq!(output.multi_vectors().len(), 4);
        assert_eq!(output.multi_vectors()[2], vec![0.5, 0.5]);
    }
}
