//! Locations of the tokenizer and model graphs on disk.

use crate::error::{M3EmbedError, Result};
use crate::utils::validate_file_exists;
use crate::{DEFAULT_MODEL_DIR, DEFAULT_MODEL_FILE, DEFAULT_TOKENIZER_FILE};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of directories, starting with the start directory itself, searched
/// for the model directory.
const MAX_SEARCH_DEPTH: usize = 10;

/// File name of the golden embeddings stored next to the model graph
pub const DEFAULT_REFERENCE_FILE: &str = "bge_m3_reference_embeddings.json";

/// Paths to the two ONNX graphs an embedder needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFiles {
    pub tokenizer_path: PathBuf,
    pub model_path: PathBuf,
}

impl ModelFiles {
    pub fn new<T: Into<PathBuf>, M: Into<PathBuf>>(tokenizer_path: T, model_path: M) -> Self {
        Self {
            tokenizer_path: tokenizer_path.into(),
            model_path: model_path.into(),
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_TOKENIZER_FILE), dir.join(DEFAULT_MODEL_FILE))
    }

    /// Search `start` and its ancestors for an `onnx` directory and use the
    /// default file names inside it. The files themselves are not checked.
    pub fn locate<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = start.as_ref();
        find_model_dir(start)
            .map(Self::in_dir)
            .ok_or_else(|| M3EmbedError::file_not_found(start.join(DEFAULT_MODEL_DIR)))
    }

    /// Both files must exist.
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.tokenizer_path)?;
        validate_file_exists(&self.model_path)
    }

    /// Golden embeddings file next to the model graph.
    pub fn reference_embeddings_path(&self) -> PathBuf {
        self.model_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(DEFAULT_REFERENCE_FILE)
    }
}

/// First `onnx` directory found walking up from `start`.
pub fn find_model_dir(start: &Path) -> Option<PathBuf> {
    let start = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(start)
    };

    let found = start
        .ancestors()
        .take(MAX_SEARCH_DEPTH)
        .map(|dir| dir.join(DEFAULT_MODEL_DIR))
        .find(|candidate| candidate.is_dir());
    if let Some(ref dir) = found {
        debug!("Found model directory at {}", dir.display());
    }
    found
}
