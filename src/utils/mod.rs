//! Utility functions for the embedding engine.

use crate::error::{M3EmbedError, Result};
use std::path::Path;

/// Validates that a file exists and is a regular file.
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(M3EmbedError::file_not_found(path));
    }
    if !path.is_file() {
        return Err(M3EmbedError::invalid_input(format!(
            "Path exists but is not a file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Cosine similarity accumulated in `f64`.
///
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(M3EmbedError::dimension_mismatch(a.len(), b.len()));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_validate_file_exists() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("bge_m3_model.onnx");

        assert!(matches!(
            validate_file_exists(&file_path),
            Err(M3EmbedError::FileNotFound { .. })
        ));

        fs::write(&file_path, "content").unwrap();
        assert!(validate_file_exists(&file_path).is_ok());

        // A directory is not a file
        assert!(validate_file_exists(temp_dir.path()).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-12);

        let c = [-2.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &c).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity_is_scale_invariant() {
        let a = [0.3, -0.4, 1.2, 0.05];
        let b: Vec<f32> = a.iter().map(|x| x * 7.5).collect();
        assert!(cosine_similarity(&a, &b).unwrap() > 0.9999);
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);

        let err = cosine_similarity(&[1.0; 1024], &[1.0; 768]).unwrap_err();
        assert!(matches!(
            err,
            M3EmbedError::DimensionMismatch {
                expected: 1024,
                actual: 768
            }
        ));
    }
}
