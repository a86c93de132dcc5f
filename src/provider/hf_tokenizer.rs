//! Tokenizer session backed by a HuggingFace `tokenizer.json`.
//!
//! Useful on hosts where the ONNX Runtime extensions library is missing. The
//! encoding is already in sequence order, so the positions it reports are
//! simply `0..n`.

use crate::error::{M3EmbedError, Result};
use crate::provider::{RawTokenization, TokenizerSession};
use log::debug;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

#[derive(Debug)]
pub struct HfTokenizerSession {
    tokenizer: Tokenizer,
    path: Option<PathBuf>,
}

impl HfTokenizerSession {
    /// Load from a `tokenizer.json` file or a directory containing one.
    pub fn from_path(tokenizer_path: &Path) -> Result<Self> {
        let tokenizer_json_path = if tokenizer_path.is_dir() {
            tokenizer_path.join("tokenizer.json")
        } else {
            tokenizer_path.to_path_buf()
        };

        if !tokenizer_json_path.is_file() {
            return Err(M3EmbedError::file_not_found(&tokenizer_json_path));
        }

        debug!("Loading tokenizer from {}", tokenizer_json_path.display());
        let tokenizer = Tokenizer::from_file(&tokenizer_json_path).map_err(|e| {
            M3EmbedError::session_initialization(format!(
                "Failed to load tokenizer from {}: {}",
                tokenizer_json_path.display(),
                e
            ))
        })?;

        Ok(Self {
            tokenizer,
            path: Some(tokenizer_json_path),
        })
    }

    pub fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            path: None,
        }
    }

    /// File the tokenizer was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl TokenizerSession for HfTokenizerSession {
    fn tokenize(&self, text: &str) -> Result<RawTokenization> {
        let encoding = self.tokenizer.encode(text, true)?;
        let tokens: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let positions = (0..tokens.len() as i64).collect();
        Ok(RawTokenization::new(tokens, positions))
    }
}
