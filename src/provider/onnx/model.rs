//! Model graph session.

use super::session::create_model_session;
use crate::config::{EmbedderConfig, ExecutionProvider};
use crate::error::{M3EmbedError, Result};
use crate::provider::{ModelSession, RawModelOutputs};
use log::debug;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

const DENSE_OUTPUT: usize = 0;
const SPARSE_OUTPUT: usize = 1;
const MULTI_VECTOR_OUTPUT: usize = 2;

/// The BGE-M3 encoder with dense, sparse and multi-vector heads.
#[derive(Debug)]
pub struct OnnxModelSession {
    session: Session,
    provider: ExecutionProvider,
    path: PathBuf,
}

impl OnnxModelSession {
    /// Open the model on the first usable provider of the configured chain.
    pub fn new(model_path: &Path, config: &EmbedderConfig) -> Result<Self> {
        let (session, provider) = create_model_session(model_path, config)?;
        Ok(Self {
            session,
            provider,
            path: model_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelSession for OnnxModelSession {
    fn run(&self, input_ids: &[i64], attention_mask: &[i64]) -> Result<RawModelOutputs> {
        if input_ids.len() != attention_mask.len() {
            return Err(M3EmbedError::invalid_input(format!(
                "input_ids has {} entries but attention_mask has {}",
                input_ids.len(),
                attention_mask.len()
            )));
        }

        let shape = vec![1, input_ids.len()];
        let input_ids_value = Value::from_array((shape.clone(), input_ids.to_vec()))?;
        let attention_mask_value = Value::from_array((shape, attention_mask.to_vec()))?;

        let start = Instant::now();
        let outputs = self.session.run(ort::inputs![
            "input_ids" => input_ids_value,
            "attention_mask" => attention_mask_value,
        ]?)?;
        debug!(
            "Model inference on {} for {} tokens: {:?}",
            self.provider,
            input_ids.len(),
            start.elapsed()
        );

        if outputs.len() <= MULTI_VECTOR_OUTPUT {
            return Err(M3EmbedError::inference(format!(
                "Model returned {} outputs, expected 3 (dense, sparse, multi-vector)",
                outputs.len()
            )));
        }

        let (dense_shape, dense) = outputs[DENSE_OUTPUT].try_extract_raw_tensor::<f32>()?;
        let (sparse_shape, sparse) = outputs[SPARSE_OUTPUT].try_extract_raw_tensor::<f32>()?;
        let (multi_shape, multi) = outputs[MULTI_VECTOR_OUTPUT].try_extract_raw_tensor::<f32>()?;

        RawModelOutputs::from_raw_parts(
            (&dense_shape, dense),
            (&sparse_shape, sparse),
            (&multi_shape, multi),
        )
    }

    fn execution_provider(&self) -> ExecutionProvider {
        self.provider
    }
}
