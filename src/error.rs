//! Error types for the BGE-M3 embedding engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the embedding engine.
pub type Result<T> = std::result::Result<T, M3EmbedError>;

/// Errors raised while configuring, opening or running an embedder.
#[derive(Error, Debug)]
pub enum M3EmbedError {
    /// Unsupported or invalid configuration, e.g. an unknown provider tag
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A native session could not be opened. Fatal to the embedder being built.
    #[error("Session initialization failed: {message}")]
    SessionInitialization { message: String },

    /// A single `generate_embeddings` call failed; the embedder stays usable
    #[error("Inference error: {message}")]
    Inference { message: String },

    /// Tokenization errors
    #[error("Tokenization error: {message}")]
    Tokenization { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A raw tensor did not have the rank or layout the pipeline expects
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// File not found errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The embedder's sessions have already been released
    #[error("Embedder sessions have been closed")]
    SessionClosed,

    /// A caller-side deadline expired before inference finished
    #[error("Embedding generation timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON fixture errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anyhow errors for compatibility
    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl M3EmbedError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a session initialization error
    pub fn session_initialization<S: Into<String>>(message: S) -> Self {
        Self::SessionInitialization {
            message: message.into(),
        }
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(message: S) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create a tokenization error
    pub fn tokenization<S: Into<String>>(message: S) -> Self {
        Self::Tokenization {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<E: Into<String>, A: Into<String>>(expected: E, actual: A) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a file not found error
    pub fn file_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a timeout error
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            elapsed_ms: elapsed.as_millis(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_session_initialization(&self) -> bool {
        matches!(self, Self::SessionInitialization { .. } | Self::FileNotFound { .. })
    }

    /// True for failures scoped to a single call (the embedder remains usable).
    pub fn is_inference(&self) -> bool {
        matches!(
            self,
            Self::Inference { .. }
                | Self::Tokenization { .. }
                | Self::InvalidInput { .. }
                | Self::ShapeMismatch { .. }
                | Self::Timeout { .. }
        )
    }
}

// Runtime failures surfacing from a `run` call. Session construction maps its
// errors explicitly to `SessionInitialization` instead of going through here.
#[cfg(feature = "onnx")]
impl From<ort::Error> for M3EmbedError {
    fn from(error: ort::Error) -> Self {
        Self::inference(format!("ORT error: {}", error))
    }
}

impl From<tokenizers::Error> for M3EmbedError {
    fn from(error: tokenizers::Error) -> Self {
        Self::tokenization(format!("Tokenizer error: {}", error))
    }
}

impl From<ndarray::ShapeError> for M3EmbedError {
    fn from(error: ndarray::ShapeError) -> Self {
        Self::inference(format!("Tensor shape error: {}", error))
    }
}
