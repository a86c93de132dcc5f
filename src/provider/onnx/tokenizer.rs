//! Tokenizer graph session.

use super::session::create_tokenizer_session;
use crate::config::EmbedderConfig;
use crate::error::{M3EmbedError, Result};
use crate::provider::{RawTokenization, TokenizerSession};
use log::debug;
use ndarray::Array1;
use ort::memory::Allocator;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use std::path::{Path, PathBuf};

/// Name of the string input of the tokenizer graph
const INPUT_NAME: &str = "inputs";
/// Output index of the emitted token ids
const TOKENS_OUTPUT: usize = 0;
/// Output index of the target position of each token
const POSITIONS_OUTPUT: usize = 2;

/// The BGE-M3 tokenizer exported as an ONNX graph with custom operators.
#[derive(Debug)]
pub struct OnnxTokenizerSession {
    session: Session,
    path: PathBuf,
}

impl OnnxTokenizerSession {
    pub fn new(tokenizer_path: &Path, config: &EmbedderConfig) -> Result<Self> {
        let session = create_tokenizer_session(tokenizer_path, config)?;
        Ok(Self {
            session,
            path: tokenizer_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenizerSession for OnnxTokenizerSession {
    fn tokenize(&self, text: &str) -> Result<RawTokenization> {
        let input = Tensor::<String>::from_string_array(
            &Allocator::default(),
            Array1::from_vec(vec![text.to_string()]),
        )
        .map_err(|e| M3EmbedError::tokenization(format!("Failed to build text tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input]?)
            .map_err(|e| M3EmbedError::tokenization(format!("Tokenizer run failed: {}", e)))?;

        if outputs.len() <= POSITIONS_OUTPUT {
            return Err(M3EmbedError::tokenization(format!(
                "Tokenizer graph returned {} outputs, expected at least {}",
                outputs.len(),
                POSITIONS_OUTPUT + 1
            )));
        }

        let tokens = integer_output(&outputs[TOKENS_OUTPUT], "tokens")?;
        let positions = integer_output(&outputs[POSITIONS_OUTPUT], "positions")?;
        debug!(
            "Tokenizer produced {} tokens and {} positions",
            tokens.len(),
            positions.len()
        );

        Ok(RawTokenization::new(tokens, positions))
    }
}

/// Read an int32 output, accepting int64 as well.
fn integer_output(value: &DynValue, name: &str) -> Result<Vec<i64>> {
    if let Ok((_, data)) = value.try_extract_raw_tensor::<i32>() {
        return Ok(data.iter().map(|&v| i64::from(v)).collect());
    }
    let (_, data) = value.try_extract_raw_tensor::<i64>().map_err(|e| {
        M3EmbedError::tokenization(format!(
            "Tokenizer output '{}' is not an integer tensor: {}",
            name, e
        ))
    })?;
    Ok(data.to_vec())
}
