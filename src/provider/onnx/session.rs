//! ONNX Runtime session construction for the tokenizer and model graphs.

use crate::config::{EmbedderConfig, ExecutionProvider};
use crate::error::{M3EmbedError, Result};
use crate::utils::validate_file_exists;
use log::{debug, info, warn};
use ort::execution_providers::{
    ArenaExtendStrategy, CPUExecutionProvider, CUDAExecutionProvider,
    ExecutionProvider as OrtExecutionProvider, ExecutionProviderDispatch,
};
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::path::Path;

fn init_error(context: &str, error: ort::Error) -> M3EmbedError {
    M3EmbedError::session_initialization(format!("{}: {}", context, error))
}

/// Map a native severity (0 verbose .. 4 fatal) onto the runtime's log level.
pub(crate) fn log_level(severity: i32) -> LogLevel {
    match severity {
        i32::MIN..=0 => LogLevel::Verbose,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        3 => LogLevel::Error,
        _ => LogLevel::Fatal,
    }
}

pub(crate) fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn cpu_provider(config: &EmbedderConfig) -> ExecutionProviderDispatch {
    let mut cpu = CPUExecutionProvider::default();
    if config.enable_cpu_mem_arena {
        cpu = cpu.with_arena_allocator();
    }
    cpu.build()
}

fn base_builder(config: &EmbedderConfig) -> Result<SessionBuilder> {
    Session::builder()
        .map_err(|e| init_error("Failed to create session builder", e))?
        .with_log_level(log_level(config.log_severity_level))
        .map_err(|e| init_error("Failed to set log severity", e))?
        .with_memory_pattern(config.enable_memory_pattern)
        .map_err(|e| init_error("Failed to configure memory pattern", e))?
        .with_optimization_level(optimization_level(config.graph_optimization_level))
        .map_err(|e| init_error("Failed to set optimization level", e))
}

/// Open the tokenizer graph on the CPU with the text-processing custom
/// operators registered.
pub fn create_tokenizer_session(tokenizer_path: &Path, config: &EmbedderConfig) -> Result<Session> {
    validate_file_exists(tokenizer_path)?;
    debug!(
        "Building tokenizer session from {} on CPU",
        tokenizer_path.display()
    );

    let mut builder = base_builder(config)?
        .with_execution_providers([cpu_provider(config)])
        .map_err(|e| init_error("Failed to register CPU provider for tokenizer", e))?;

    builder = match config.custom_ops_library {
        Some(ref library) => {
            debug!("Registering custom operator library {}", library.display());
            builder
                .with_operator_library(&*library.to_string_lossy())
                .map_err(|e| {
                    init_error(
                        &format!("Failed to register custom ops from {}", library.display()),
                        e,
                    )
                })?
        }
        None => builder
            .with_extensions()
            .map_err(|e| init_error("Failed to enable runtime extensions", e))?,
    };

    builder.commit_from_file(tokenizer_path).map_err(|e| {
        init_error(
            &format!("Failed to load tokenizer from {}", tokenizer_path.display()),
            e,
        )
    })
}

/// Open the model graph on the first provider of the resolved chain that
/// accepts it, returning the session together with that provider.
///
/// Accelerators that are unavailable or fail to initialize are skipped with
/// a warning. A CPU failure ends the search.
pub fn create_model_session(
    model_path: &Path,
    config: &EmbedderConfig,
) -> Result<(Session, ExecutionProvider)> {
    validate_file_exists(model_path)?;

    let chain = config.resolved_providers();
    debug!(
        "Building model session from {} with provider chain {:?}",
        model_path.display(),
        chain
    );

    for provider in chain {
        match provider {
            ExecutionProvider::Cpu => {
                let session = commit_model_session(model_path, config, cpu_provider(config))?;
                info!("Model session running on {}", provider);
                return Ok((session, provider));
            }
            ExecutionProvider::Cuda => match try_cuda_session(model_path, config) {
                Ok(session) => {
                    info!(
                        "Model session running on {} (device {})",
                        provider, config.cuda_device_id
                    );
                    return Ok((session, provider));
                }
                Err(e) => warn!("Skipping {} execution provider: {}", provider, e),
            },
        }
    }

    Err(M3EmbedError::session_initialization(
        "No execution provider could open the model session",
    ))
}

fn try_cuda_session(model_path: &Path, config: &EmbedderConfig) -> Result<Session> {
    let mut cuda = CUDAExecutionProvider::default()
        .with_device_id(config.cuda_device_id)
        .with_arena_extend_strategy(ArenaExtendStrategy::NextPowerOfTwo);
    if let Some(limit) = config.cuda_memory_limit {
        cuda = cuda.with_memory_limit(limit);
    }

    let available = cuda
        .is_available()
        .map_err(|e| init_error("Failed to query CUDA availability", e))?;
    if !available {
        return Err(M3EmbedError::session_initialization(
            "CUDA is not available in this ONNX Runtime build",
        ));
    }

    commit_model_session(model_path, config, cuda.build().error_on_failure())
}

fn commit_model_session(
    model_path: &Path,
    config: &EmbedderConfig,
    provider: ExecutionProviderDispatch,
) -> Result<Session> {
    base_builder(config)?
        .with_intra_threads(config.effective_intra_op_threads())
        .map_err(|e| init_error("Failed to set intra-op threads", e))?
        .with_execution_providers([provider])
        .map_err(|e| init_error("Failed to register execution provider", e))?
        .commit_from_file(model_path)
        .map_err(|e| {
            init_error(
                &format!("Failed to load model from {}", model_path.display()),
                e,
            )
        })
}
