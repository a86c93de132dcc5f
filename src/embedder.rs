//! The BGE-M3 embedder facade.

use crate::config::{EmbedderConfig, ExecutionProvider};
use crate::error::{M3EmbedError, Result};
use crate::output::{EmbeddingOutput, ProviderInfo};
use crate::processor::{build_output, reorder};
use crate::provider::{ModelSession, TokenizerSession};
use log::debug;
use std::time::Instant;

#[cfg(feature = "onnx")]
use crate::model::ModelFiles;
#[cfg(feature = "onnx")]
use crate::provider::{HfTokenizerSession, OnnxModelSession, OnnxTokenizerSession};
#[cfg(feature = "onnx")]
use std::path::Path;

/// Owns a tokenizer session and a model session and turns text into
/// dense, sparse and multi-vector embeddings.
///
/// One instance handles one call at a time; wrap it in a
/// [`crate::SharedEmbedder`] to share it across threads. Sessions are
/// released by [`M3Embedder::close`] or on drop.
#[derive(Debug)]
pub struct M3Embedder {
    tokenizer: Option<Box<dyn TokenizerSession>>,
    model: Option<Box<dyn ModelSession>>,
    config: EmbedderConfig,
    execution_provider: ExecutionProvider,
}

impl M3Embedder {
    /// Open both ONNX graphs. The tokenizer runs on the CPU; the model runs on
    /// the first provider of the configured chain that accepts it.
    ///
    /// Either both sessions open or neither is kept.
    #[cfg(feature = "onnx")]
    pub fn new<T, M>(tokenizer_path: T, model_path: M, config: EmbedderConfig) -> Result<Self>
    where
        T: AsRef<Path>,
        M: AsRef<Path>,
    {
        config.validate()?;
        debug!(
            "Creating M3Embedder with tokenizer {} and model {}",
            tokenizer_path.as_ref().display(),
            model_path.as_ref().display()
        );

        let tokenizer = OnnxTokenizerSession::new(tokenizer_path.as_ref(), &config)?;
        let model = OnnxModelSession::new(model_path.as_ref(), &config)?;
        Self::from_sessions(Box::new(tokenizer), Box::new(model), config)
    }

    /// Open the graphs named by `files`.
    #[cfg(feature = "onnx")]
    pub fn from_model_files(files: &ModelFiles, config: EmbedderConfig) -> Result<Self> {
        files.validate()?;
        Self::new(&files.tokenizer_path, &files.model_path, config)
    }

    /// Pair the ONNX model graph with a HuggingFace `tokenizer.json` instead of
    /// the tokenizer graph.
    #[cfg(feature = "onnx")]
    pub fn with_hf_tokenizer<T, M>(
        tokenizer_json: T,
        model_path: M,
        config: EmbedderConfig,
    ) -> Result<Self>
    where
        T: AsRef<Path>,
        M: AsRef<Path>,
    {
        config.validate()?;
        let tokenizer = HfTokenizerSession::from_path(tokenizer_json.as_ref())?;
        let model = OnnxModelSession::new(model_path.as_ref(), &config)?;
        Self::from_sessions(Box::new(tokenizer), Box::new(model), config)
    }

    /// Build an embedder over already-open sessions.
    pub fn from_sessions(
        tokenizer: Box<dyn TokenizerSession>,
        model: Box<dyn ModelSession>,
        config: EmbedderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let execution_provider = model.execution_provider();
        if execution_provider != config.execution_provider {
            debug!(
                "Requested {} but model session runs on {}",
                config.execution_provider, execution_provider
            );
        }

        Ok(Self {
            tokenizer: Some(tokenizer),
            model: Some(model),
            config,
            execution_provider,
        })
    }

    /// Tokenize, reorder, run the model and extract all three representations
    /// for `text`.
    ///
    /// A failure here leaves the embedder usable for the next call.
    pub fn generate_embeddings(&self, text: &str) -> Result<EmbeddingOutput> {
        let (tokenizer, model) = match (&self.tokenizer, &self.model) {
            (Some(tokenizer), Some(model)) => (tokenizer, model),
            _ => return Err(M3EmbedError::SessionClosed),
        };

        let start = Instant::now();
        let raw = tokenizer.tokenize(text)?;
        let ordered = reorder(&raw);
        let tokenize_elapsed = start.elapsed();

        let infer_start = Instant::now();
        let outputs = model.run(&ordered.input_ids, &ordered.attention_mask)?;
        let infer_elapsed = infer_start.elapsed();

        let token_count = ordered.len();
        let output = build_output(ordered, &outputs);
        debug!(
            "Embedded {} tokens on {}: tokenize {:?}, inference {:?}, total {:?}",
            token_count,
            self.execution_provider,
            tokenize_elapsed,
            infer_elapsed,
            start.elapsed()
        );

        Ok(output)
    }

    /// Embed each text in turn. Stops at the first failure.
    pub fn generate_embeddings_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>> {
        texts
            .iter()
            .map(|text| self.generate_embeddings(text))
            .collect()
    }

    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    /// Provider the model session actually runs on.
    pub fn execution_provider(&self) -> ExecutionProvider {
        self.execution_provider
    }

    pub fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            tokenizer_provider: ExecutionProvider::Cpu,
            model_provider: self.execution_provider,
            requested_provider: self.config.execution_provider,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tokenizer.is_none() && self.model.is_none()
    }

    /// Release both sessions. Calling it again does nothing.
    pub fn close(&mut self) {
        let tokenizer = self.tokenizer.take();
        let model = self.model.take();
        if tokenizer.is_some() || model.is_some() {
            debug!("Releasing M3Embedder sessions");
        }
    }
}

impl Drop for M3Embedder {
    fn drop(&mut self) {
        self.close();
    }
}
