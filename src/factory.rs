//! Preset constructors for [`M3Embedder`] over the ONNX backends.

use crate::config::{EmbedderConfig, ExecutionProvider};
use crate::embedder::M3Embedder;
use crate::error::Result;
use std::path::Path;

/// Embedder tuned for CPU inference.
pub fn create_cpu_optimized<T: AsRef<Path>, M: AsRef<Path>>(
    tokenizer_path: T,
    model_path: M,
) -> Result<M3Embedder> {
    log::debug!("Creating CPU-optimized embedder");
    M3Embedder::new(tokenizer_path, model_path, EmbedderConfig::cpu_optimized())
}

/// Embedder on CUDA device `device_id`, falling back to the CPU when CUDA
/// cannot be used.
pub fn create_cuda_optimized<T: AsRef<Path>, M: AsRef<Path>>(
    tokenizer_path: T,
    model_path: M,
    device_id: i32,
) -> Result<M3Embedder> {
    log::debug!("Creating CUDA-optimized embedder on device {}", device_id);
    M3Embedder::new(
        tokenizer_path,
        model_path,
        EmbedderConfig::cuda_optimized(device_id),
    )
}

/// Embedder with an explicit provider chain. `fallbacks` defaults to CPU.
pub fn create_custom<T: AsRef<Path>, M: AsRef<Path>>(
    tokenizer_path: T,
    model_path: M,
    primary: ExecutionProvider,
    fallbacks: Option<Vec<ExecutionProvider>>,
    cuda_device_id: i32,
) -> Result<M3Embedder> {
    log::debug!(
        "Creating custom embedder: primary {}, fallbacks {:?}",
        primary,
        fallbacks
    );
    M3Embedder::new(
        tokenizer_path,
        model_path,
        EmbedderConfig::custom(primary, fallbacks, cuda_device_id),
    )
}
