//! # BGE-M3 Embedding Engine
//!
//! Multi-representation text embeddings from the BGE-M3 model split into two
//! ONNX graphs: a tokenizer graph that runs on the CPU and a model graph that
//! runs on the best available execution provider.
//!
//! ## Features
//!
//! - **Three representations per text**: a dense sentence vector, sparse
//!   lexical weights keyed by token id, and one vector per token
//! - **Provider fallback**: CUDA when requested and available, CPU otherwise,
//!   with the provider actually in use reported back
//! - **Pluggable sessions**: tokenizer and model engines sit behind traits so
//!   the pipeline can run against any backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bge_m3_embed::{EmbedderConfig, M3Embedder, ModelFiles};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let files = ModelFiles::locate(std::env::current_dir()?)?;
//! let embedder = M3Embedder::from_model_files(&files, EmbedderConfig::cuda_optimized(0))?;
//!
//! let output = embedder.generate_embeddings("hello world")?;
//! println!(
//!     "dense: {}, sparse: {}, multi-vector: {} (on {})",
//!     output.dense_dimension(),
//!     output.sparse_weights().len(),
//!     output.multi_vectors().len(),
//!     embedder.execution_provider()
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedder;
pub mod error;
#[cfg(feature = "onnx")]
pub mod factory;
pub mod model;
pub mod output;
pub mod processor;
pub mod provider;
pub mod reference;
pub mod shared;
pub mod utils;

// Re-export main types for convenience
pub use config::{EmbedderConfig, EmbedderConfigBuilder, ExecutionProvider};
pub use embedder::M3Embedder;
pub use error::{M3EmbedError, Result};
pub use model::ModelFiles;
pub use output::{EmbeddingOutput, ProviderInfo};
pub use provider::{ModelSession, RawModelOutputs, RawTokenization, TokenizerSession};
pub use reference::{ParityReport, ParityTolerance, ReferenceEmbedding};
pub use shared::SharedEmbedder;

/// Current version of the bge-m3-embed crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default native runtime log severity (warning)
pub const DEFAULT_LOG_SEVERITY_LEVEL: i32 = 2;

/// Default CUDA arena memory limit in bytes (2 GiB)
pub const DEFAULT_CUDA_MEMORY_LIMIT: usize = 2 * 1024 * 1024 * 1024;

/// Default file name of the tokenizer graph
pub const DEFAULT_TOKENIZER_FILE: &str = "bge_m3_tokenizer.onnx";

/// Default file name of the model graph
pub const DEFAULT_MODEL_FILE: &str = "bge_m3_model.onnx";

/// Directory holding both graphs, searched for by [`ModelFiles::locate`]
pub const DEFAULT_MODEL_DIR: &str = "onnx";

/// Hidden size of the BGE-M3 dense and multi-vector outputs
pub const BGE_M3_HIDDEN_SIZE: usize = 1024;
