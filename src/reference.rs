//! Comparison of embedder output against golden reference embeddings.
//!
//! The fixture is a JSON object keyed by input text:
//!
//! ```json
//! { "hello world": { "dense_vecs": [..], "lexical_weights": { "33600": 0.21 }, "colbert_vecs": [[..]] } }
//! ```

use crate::error::Result;
use crate::output::EmbeddingOutput;
use crate::utils::{cosine_similarity, validate_file_exists};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reference embeddings for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEmbedding {
    pub dense_vecs: Vec<f32>,
    /// Token id (as a decimal string) to weight
    pub lexical_weights: HashMap<String, f64>,
    pub colbert_vecs: Vec<Vec<f32>>,
}

impl From<&EmbeddingOutput> for ReferenceEmbedding {
    fn from(output: &EmbeddingOutput) -> Self {
        Self {
            dense_vecs: output.dense_embedding().to_vec(),
            lexical_weights: output
                .sparse_weights()
                .iter()
                .map(|(token, &weight)| (token.to_string(), f64::from(weight)))
                .collect(),
            colbert_vecs: output.multi_vectors().to_vec(),
        }
    }
}

/// Load a fixture file, keyed by input text.
pub fn load_reference_embeddings<P: AsRef<Path>>(
    path: P,
) -> Result<BTreeMap<String, ReferenceEmbedding>> {
    let path = path.as_ref();
    validate_file_exists(path)?;
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Acceptance thresholds for [`compare`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParityTolerance {
    /// Dense cosine similarity must exceed this
    pub dense_min_cosine: f64,
    /// Each lexical weight must differ by less than this
    pub sparse_max_abs_diff: f64,
    /// Each per-token vector's cosine similarity must exceed this
    pub multi_vector_min_cosine: f64,
}

impl Default for ParityTolerance {
    fn default() -> Self {
        Self {
            dense_min_cosine: 0.9999,
            sparse_max_abs_diff: 1e-3,
            multi_vector_min_cosine: 0.9999,
        }
    }
}

impl ParityTolerance {
    /// Sparse weights must agree to 1e-6.
    pub fn strict() -> Self {
        Self {
            sparse_max_abs_diff: 1e-6,
            ..Self::default()
        }
    }
}

/// A single disagreement found by [`compare`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParityMismatch {
    DenseDimension { expected: usize, actual: usize },
    DenseSimilarity { similarity: f64 },
    SparseCount { expected: usize, actual: usize },
    SparseKeyNotNumeric { key: String },
    SparseMissingToken { token: i64 },
    SparseWeight { token: i64, expected: f64, actual: f64 },
    MultiVectorCount { expected: usize, actual: usize },
    MultiVectorDimension { index: usize, expected: usize, actual: usize },
    MultiVectorSimilarity { index: usize, similarity: f64 },
}

impl fmt::Display for ParityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DenseDimension { expected, actual } => {
                write!(f, "dense dimension {} != reference {}", actual, expected)
            }
            Self::DenseSimilarity { similarity } => {
                write!(f, "dense similarity {:.10}", similarity)
            }
            Self::SparseCount { expected, actual } => {
                write!(f, "{} lexical weights, reference has {}", actual, expected)
            }
            Self::SparseKeyNotNumeric { key } => {
                write!(f, "reference lexical weight key '{}' is not a token id", key)
            }
            Self::SparseMissingToken { token } => {
                write!(f, "token {} missing from lexical weights", token)
            }
            Self::SparseWeight {
                token,
                expected,
                actual,
            } => write!(
                f,
                "token {} weight {:.8}, reference {:.8}",
                token, actual, expected
            ),
            Self::MultiVectorCount { expected, actual } => {
                write!(f, "{} token vectors, reference has {}", actual, expected)
            }
            Self::MultiVectorDimension {
                index,
                expected,
                actual,
            } => write!(
                f,
                "token vector {} has dimension {}, reference {}",
                index, actual, expected
            ),
            Self::MultiVectorSimilarity { index, similarity } => {
                write!(f, "token vector {} similarity {:.10}", index, similarity)
            }
        }
    }
}

/// Outcome of comparing one output with its reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParityReport {
    /// `None` when the dense dimensions differ
    pub dense_similarity: Option<f64>,
    pub mismatches: Vec<ParityMismatch>,
}

impl ParityReport {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for ParityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_match() {
            return f.write_str("all representations match");
        }
        let lines: Vec<String> = self.mismatches.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("; "))
    }
}

/// Compare all three representations of `output` with `reference`.
pub fn compare(
    output: &EmbeddingOutput,
    reference: &ReferenceEmbedding,
    tolerance: &ParityTolerance,
) -> ParityReport {
    let mut report = ParityReport::default();
    compare_dense(output, reference, tolerance, &mut report);
    compare_sparse(output, reference, tolerance, &mut report);
    compare_multi_vectors(output, reference, tolerance, &mut report);
    report
}

fn compare_dense(
    output: &EmbeddingOutput,
    reference: &ReferenceEmbedding,
    tolerance: &ParityTolerance,
    report: &mut ParityReport,
) {
    match cosine_similarity(output.dense_embedding(), &reference.dense_vecs) {
        Ok(similarity) => {
            report.dense_similarity = Some(similarity);
            if similarity <= tolerance.dense_min_cosine {
                report
                    .mismatches
                    .push(ParityMismatch::DenseSimilarity { similarity });
            }
        }
        Err(_) => report.mismatches.push(ParityMismatch::DenseDimension {
            expected: reference.dense_vecs.len(),
            actual: output.dense_dimension(),
        }),
    }
}

fn compare_sparse(
    output: &EmbeddingOutput,
    reference: &ReferenceEmbedding,
    tolerance: &ParityTolerance,
    report: &mut ParityReport,
) {
    let weights = output.sparse_weights();
    if weights.len() != reference.lexical_weights.len() {
        report.mismatches.push(ParityMismatch::SparseCount {
            expected: reference.lexical_weights.len(),
            actual: weights.len(),
        });
        return;
    }

    let mut expected: Vec<(&String, &f64)> = reference.lexical_weights.iter().collect();
    expected.sort_by(|a, b| a.0.cmp(b.0));

    for (key, &expected_weight) in expected {
        let Ok(token) = key.parse::<i64>() else {
            report
                .mismatches
                .push(ParityMismatch::SparseKeyNotNumeric { key: key.clone() });
            continue;
        };
        match weights.get(&token) {
            None => report
                .mismatches
                .push(ParityMismatch::SparseMissingToken { token }),
            Some(&actual) => {
                let actual = f64::from(actual);
                if (actual - expected_weight).abs() >= tolerance.sparse_max_abs_diff {
                    report.mismatches.push(ParityMismatch::SparseWeight {
                        token,
                        expected: expected_weight,
                        actual,
                    });
                }
            }
        }
    }
}

fn compare_multi_vectors(
    output: &EmbeddingOutput,
    reference: &ReferenceEmbedding,
    tolerance: &ParityTolerance,
    report: &mut ParityReport,
) {
    let vectors = output.multi_vectors();
    if vectors.len() != reference.colbert_vecs.len() {
        report.mismatches.push(ParityMismatch::MultiVectorCount {
            expected: reference.colbert_vecs.len(),
            actual: vectors.len(),
        });
        return;
    }

    for (index, (actual, expected)) in vectors.iter().zip(&reference.colbert_vecs).enumerate() {
        match cosine_similarity(actual, expected) {
            Ok(similarity) if similarity <= tolerance.multi_vector_min_cosine => {
                report
                    .mismatches
                    .push(ParityMismatch::MultiVectorSimilarity { index, similarity });
            }
            Ok(_) => {}
            Err(_) => report.mismatches.push(ParityMismatch::MultiVectorDimension {
                index,
                expected: expected.len(),
                actual: actual.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_output() -> EmbeddingOutput {
        let mut sparse = HashMap::new();
        sparse.insert(33600, 0.21f32);
        sparse.insert(8999, 0.17f32);
        EmbeddingOutput::new(
            vec![0.6, 0.8, 0.0],
            sparse,
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.5, 0.5, 0.0],
            ],
            vec![0, 33600, 8999, 2],
        )
    }

    #[test]
    fn test_output_matches_its_own_reference() {
        let output = sample_output();
        let reference = ReferenceEmbedding::from(&output);

        let report = compare(&output, &reference, &ParityTolerance::strict());
        assert!(report.is_match(), "{}", report);
        assert!(report.dense_similarity.unwrap() > 0.9999);
    }

    #[test]
    fn test_sparse_tolerance_levels() {
        let output = sample_output();
        let mut reference = ReferenceEmbedding::from(&output);
        // Off by 1e-4: fine by default, rejected when strict
        *reference.lexical_weights.get_mut("8999").unwrap() += 1e-4;

        assert!(compare(&output, &reference, &ParityTolerance::default()).is_match());

        let strict = compare(&output, &reference, &ParityTolerance::strict());
        assert_eq!(strict.mismatches.len(), 1);
        assert!(matches!(
            strict.mismatches[0],
            ParityMismatch::SparseWeight { token: 8999, .. }
        ));
    }

    #[test]
    fn test_sparse_key_differences() {
        let output = sample_output();

        let mut renamed = ReferenceEmbedding::from(&output);
        let weight = renamed.lexical_weights.remove("8999").unwrap();
        renamed.lexical_weights.insert("9000".to_string(), weight);
        let report = compare(&output, &renamed, &ParityTolerance::default());
        assert_eq!(
            report.mismatches,
            vec![ParityMismatch::SparseMissingToken { token: 9000 }]
        );

        let mut extra = ReferenceEmbedding::from(&output);
        extra.lexical_weights.insert("5".to_string(), 0.5);
        let report = compare(&output, &extra, &ParityTolerance::default());
        assert!(matches!(
            report.mismatches[0],
            ParityMismatch::SparseCount {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_dense_and_multi_vector_failures() {
        let output = sample_output();

        let mut reference = ReferenceEmbedding::from(&output);
        reference.dense_vecs = vec![0.8, -0.6, 0.0];
        reference.colbert_vecs[2] = vec![1.0, 0.0, 0.0];
        let report = compare(&output, &reference, &ParityTolerance::default());

        assert!(!report.is_match());
        assert!(report.dense_similarity.unwrap().abs() < 1e-9);
        assert!(report
            .mismatches
            .iter()
            .any(|m| matches!(m, ParityMismatch::MultiVectorSimilarity { index: 2, .. })));

        let mut short = ReferenceEmbedding::from(&output);
        short.colbert_vecs.pop();
        short.dense_vecs.push(0.0);
        let report = compare(&output, &short, &ParityTolerance::default());
        assert_eq!(report.dense_similarity, None);
        assert!(report.mismatches.contains(&ParityMismatch::DenseDimension {
            expected: 4,
            actual: 3
        }));
        assert!(report.mismatches.contains(&ParityMismatch::MultiVectorCount {
            expected: 3,
            actual: 4
        }));
    }

    #[test]
    fn test_load_reference_embeddings() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bge_m3_reference_embeddings.json");
        let fixture = serde_json::json!({
            "hello world": {
                "dense_vecs": [0.6, 0.8, 0.0],
                "lexical_weights": { "33600": 0.21, "8999": 0.17 },
                "colbert_vecs": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5, 0.0]]
            }
        });
        fs::write(&path, fixture.to_string()).unwrap();

        let references = load_reference_embeddings(&path).unwrap();
        assert_eq!(references.len(), 1);

        let reference = &references["hello world"];
        assert_eq!(reference.colbert_vecs.len(), 4);
        assert!(compare(&sample_output(), reference, &ParityTolerance::default()).is_match());
    }

    #[test]
    fn test_load_reference_errors() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(load_reference_embeddings(&missing).is_err());

        let broken = temp_dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            load_reference_embeddings(&broken),
            Err(crate::error::M3EmbedError::Json(_))
        ));
    }
}
