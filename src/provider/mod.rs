//! Session traits over the opaque tokenizer and model engines.
//!
//! Both engines are black boxes: the tokenizer turns one string into token ids
//! and target positions, the model turns ordered ids plus a mask into three raw
//! tensors. Everything between the two lives in [`crate::processor`].

use crate::config::ExecutionProvider;
use crate::error::{M3EmbedError, Result};
use ndarray::{Array2, Array3};
use std::fmt::Debug;

pub mod hf_tokenizer;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod resolution;

pub use hf_tokenizer::HfTokenizerSession;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxModelSession, OnnxTokenizerSession};
pub use resolution::resolve_providers;

/// Raw tokenizer output: ids in emission order and the position each id
/// belongs at. `tokens` may be longer than `positions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTokenization {
    pub tokens: Vec<i64>,
    pub positions: Vec<i64>,
}

impl RawTokenization {
    pub fn new(tokens: Vec<i64>, positions: Vec<i64>) -> Self {
        Self { tokens, positions }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() || self.positions.is_empty()
    }
}

/// The three model outputs for a batch of one.
///
/// `dense` is `[1, D]`; `sparse` and `multi_vector` are `[1, N, H]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelOutputs {
    pub dense: Array2<f32>,
    pub sparse: Array3<f32>,
    pub multi_vector: Array3<f32>,
}

impl RawModelOutputs {
    /// Assemble outputs from `(shape, data)` pairs as returned by the runtime,
    /// checking ranks and a non-empty batch dimension.
    pub fn from_raw_parts(
        dense: (&[i64], &[f32]),
        sparse: (&[i64], &[f32]),
        multi_vector: (&[i64], &[f32]),
    ) -> Result<Self> {
        let dense_shape = to_dims::<2>("dense", dense.0)?;
        let sparse_shape = to_dims::<3>("sparse", sparse.0)?;
        let multi_shape = to_dims::<3>("multi-vector", multi_vector.0)?;

        Ok(Self {
            dense: Array2::from_shape_vec((dense_shape[0], dense_shape[1]), dense.1.to_vec())?,
            sparse: Array3::from_shape_vec(
                (sparse_shape[0], sparse_shape[1], sparse_shape[2]),
                sparse.1.to_vec(),
            )?,
            multi_vector: Array3::from_shape_vec(
                (multi_shape[0], multi_shape[1], multi_shape[2]),
                multi_vector.1.to_vec(),
            )?,
        })
    }
}

fn to_dims<const N: usize>(name: &str, shape: &[i64]) -> Result<[usize; N]> {
    let expected = if N == 2 { "[1, D]" } else { "[1, N, H]" };
    if shape.len() != N {
        return Err(M3EmbedError::shape_mismatch(
            format!("{} output {}", name, expected),
            format!("{:?}", shape),
        ));
    }
    let mut dims = [0usize; N];
    for (slot, &dim) in dims.iter_mut().zip(shape) {
        *slot = usize::try_from(dim).map_err(|_| {
            M3EmbedError::shape_mismatch(
                format!("{} output {}", name, expected),
                format!("{:?}", shape),
            )
        })?;
    }
    if dims[0] == 0 {
        return Err(M3EmbedError::shape_mismatch(
            format!("{} output with batch size 1", name),
            format!("{:?}", shape),
        ));
    }
    Ok(dims)
}

/// Text-to-tokens engine. Always runs on the CPU.
#[cfg_attr(test, mockall::automock)]
pub trait TokenizerSession: Send + Debug {
    /// Tokenize a single text.
    fn tokenize(&self, text: &str) -> Result<RawTokenization>;
}

/// Numeric inference engine producing dense, sparse and multi-vector tensors.
#[cfg_attr(test, mockall::automock)]
pub trait ModelSession: Send + Debug {
    /// Run the model on one ordered sequence. Both slices have equal length.
    fn run(&self, input_ids: &[i64], attention_mask: &[i64]) -> Result<RawModelOutputs>;

    /// The provider this session actually executes on.
    fn execution_provider(&self) -> ExecutionProvider;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_outputs_from_parts() {
        let dense = vec![0.1f32, 0.2, 0.3, 0.4];
        let sparse = vec![0.5f32, 0.0, 0.7];
        let multi = vec![1.0f32; 3 * 2];

        let outputs = RawModelOutputs::from_raw_parts(
            (&[1, 4], &dense),
            (&[1, 3, 1], &sparse),
            (&[1, 3, 2], &multi),
        )
        .unwrap();

        assert_eq!(outputs.dense.shape(), &[1, 4]);
        assert_eq!(outputs.sparse.shape(), &[1, 3, 1]);
        assert_eq!(outputs.multi_vector.shape(), &[1, 3, 2]);
        assert_eq!(outputs.sparse[[0, 2, 0]], 0.7);
    }

    #[test]
    fn test_raw_outputs_accept_empty_sequence() {
        let dense = vec![0.25f32; 4];
        let outputs =
            RawModelOutputs::from_raw_parts((&[1, 4], &dense), (&[1, 0, 1], &[]), (&[1, 0, 8], &[]))
                .unwrap();
        assert_eq!(outputs.sparse.shape(), &[1, 0, 1]);
        assert_eq!(outputs.multi_vector.shape(), &[1, 0, 8]);
    }

    #[test]
    fn test_raw_outputs_reject_wrong_rank() {
        let err = RawModelOutputs::from_raw_parts(
            (&[4], &[0.0; 4]),
            (&[1, 1, 1], &[0.0]),
            (&[1, 1, 1], &[0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, M3EmbedError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_raw_outputs_reject_empty_batch() {
        let err = RawModelOutputs::from_raw_parts(
            (&[0, 4], &[]),
            (&[1, 1, 1], &[0.0]),
            (&[1, 1, 1], &[0.0]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("batch size 1"));
    }

    #[test]
    fn test_raw_outputs_reject_data_length_mismatch() {
        let err = RawModelOutputs::from_raw_parts(
            (&[1, 4], &[0.0; 3]),
            (&[1, 1, 1], &[0.0]),
            (&[1, 1, 1], &[0.0]),
        )
        .unwrap_err();
        assert!(err.is_inference());
    }

    #[test]
    fn test_tokenization_is_empty() {
        assert!(RawTokenization::default().is_empty());
        assert!(RawTokenization::new(vec![5], vec![]).is_empty());
        assert!(!RawTokenization::new(vec![5], vec![0]).is_empty());
    }
}
