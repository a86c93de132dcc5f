//! Configuration types for the BGE-M3 embedder.

use crate::error::{M3EmbedError, Result};
use crate::provider::resolution::resolve_providers;
use crate::{DEFAULT_CUDA_MEMORY_LIMIT, DEFAULT_LOG_SEVERITY_LEVEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Backend that executes the model graph.
///
/// The tags `"cpu"` and `"cuda"` are the only accepted textual forms; parsing
/// anything else (including through serde) yields a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionProvider {
    /// CPU execution provider, always available
    #[default]
    Cpu,
    /// CUDA execution provider; the device comes from [`EmbedderConfig::cuda_device_id`]
    Cuda,
}

impl ExecutionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }

    pub fn is_accelerator(&self) -> bool {
        matches!(self, Self::Cuda)
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionProvider {
    type Err = M3EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            other => Err(M3EmbedError::configuration(format!(
                "unsupported execution provider '{}' (expected 'cpu' or 'cuda')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ExecutionProvider {
    type Error = M3EmbedError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ExecutionProvider> for String {
    fn from(provider: ExecutionProvider) -> Self {
        provider.as_str().to_string()
    }
}

/// Session tuning and provider selection for an [`crate::M3Embedder`].
///
/// The config is cloned into the embedder at construction and only exposed
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Provider tried first for the model session
    pub execution_provider: ExecutionProvider,

    /// Providers tried after the primary, in order. CPU is appended if missing.
    pub fallback_providers: Vec<ExecutionProvider>,

    /// CUDA device ordinal
    pub cuda_device_id: i32,

    /// Enable ONNX Runtime memory pattern optimization
    pub enable_memory_pattern: bool,

    /// Enable the CPU memory arena allocator
    pub enable_cpu_mem_arena: bool,

    /// Native runtime log severity: 0 verbose, 1 info, 2 warning, 3 error, 4 fatal
    pub log_severity_level: i32,

    /// Graph optimization level (0 = disabled .. 3 = all)
    pub graph_optimization_level: u8,

    /// Intra-op thread count for the model session (None = one per CPU core)
    pub intra_op_threads: Option<usize>,

    /// CUDA arena memory limit in bytes
    pub cuda_memory_limit: Option<usize>,

    /// Shared library providing the text-processing custom operators used by
    /// the tokenizer graph. When unset the runtime's built-in extensions are used.
    pub custom_ops_library: Option<PathBuf>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            execution_provider: ExecutionProvider::Cpu,
            fallback_providers: vec![ExecutionProvider::Cpu],
            cuda_device_id: 0,
            enable_memory_pattern: true,
            enable_cpu_mem_arena: true,
            log_severity_level: DEFAULT_LOG_SEVERITY_LEVEL,
            graph_optimization_level: 3,
            intra_op_threads: None,
            cuda_memory_limit: Some(DEFAULT_CUDA_MEMORY_LIMIT),
            custom_ops_library: None,
        }
    }
}

impl EmbedderConfig {
    /// Create a new configuration with default values (CPU only).
    pub fn new() -> Self {
        Self::default()
    }

    /// CPU inference with memory pattern and arena enabled.
    pub fn cpu_optimized() -> Self {
        Self::default()
            .with_execution_provider(ExecutionProvider::Cpu)
            .with_memory_pattern(true)
            .with_cpu_mem_arena(true)
    }

    /// CUDA inference on `device_id` with CPU fallback. The CPU arena is
    /// disabled since tensors live on the device.
    pub fn cuda_optimized(device_id: i32) -> Self {
        Self::default()
            .with_execution_provider(ExecutionProvider::Cuda)
            .with_fallback_providers(vec![ExecutionProvider::Cpu])
            .with_cuda_device_id(device_id)
            .with_memory_pattern(true)
            .with_cpu_mem_arena(false)
    }

    /// Custom provider chain. Missing fallbacks default to `[Cpu]`; the CPU
    /// arena is only enabled when the primary provider is the CPU.
    pub fn custom(
        primary: ExecutionProvider,
        fallbacks: Option<Vec<ExecutionProvider>>,
        cuda_device_id: i32,
    ) -> Self {
        Self::default()
            .with_execution_provider(primary)
            .with_fallback_providers(fallbacks.unwrap_or_else(|| vec![ExecutionProvider::Cpu]))
            .with_cuda_device_id(cuda_device_id)
            .with_memory_pattern(true)
            .with_cpu_mem_arena(primary == ExecutionProvider::Cpu)
    }

    pub fn with_execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.execution_provider = provider;
        self
    }

    pub fn with_fallback_providers(mut self, providers: Vec<ExecutionProvider>) -> Self {
        self.fallback_providers = providers;
        self
    }

    pub fn with_cuda_device_id(mut self, device_id: i32) -> Self {
        self.cuda_device_id = device_id;
        self
    }

    pub fn with_memory_pattern(mut self, enable: bool) -> Self {
        self.enable_memory_pattern = enable;
        self
    }

    pub fn with_cpu_mem_arena(mut self, enable: bool) -> Self {
        self.enable_cpu_mem_arena = enable;
        self
    }

    pub fn with_log_severity_level(mut self, level: i32) -> Self {
        self.log_severity_level = level;
        self
    }

    pub fn with_graph_optimization_level(mut self, level: u8) -> Self {
        self.graph_optimization_level = level;
        self
    }

    pub fn with_intra_op_threads(mut self, threads: usize) -> Self {
        self.intra_op_threads = Some(threads);
        self
    }

    pub fn with_cuda_memory_limit(mut self, limit: Option<usize>) -> Self {
        self.cuda_memory_limit = limit;
        self
    }

    pub fn with_custom_ops_library<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.custom_ops_library = Some(path.into());
        self
    }

    /// Ordered, deduplicated provider chain for the model session, always
    /// ending in CPU.
    pub fn resolved_providers(&self) -> Vec<ExecutionProvider> {
        resolve_providers(self.execution_provider, &self.fallback_providers)
    }

    /// Whether any provider in the chain is an accelerator.
    pub fn requests_accelerator(&self) -> bool {
        self.resolved_providers().iter().any(|p| p.is_accelerator())
    }

    /// Intra-op threads actually applied to the model session.
    pub fn effective_intra_op_threads(&self) -> usize {
        self.intra_op_threads.unwrap_or_else(num_cpus::get)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.requests_accelerator() && self.cuda_device_id < 0 {
            return Err(M3EmbedError::configuration(format!(
                "cuda_device_id must be >= 0, got {}",
                self.cuda_device_id
            )));
        }

        if !(0..=4).contains(&self.log_severity_level) {
            return Err(M3EmbedError::configuration(format!(
                "log_severity_level must be between 0 and 4, got {}",
                self.log_severity_level
            )));
        }

        if self.graph_optimization_level > 3 {
            return Err(M3EmbedError::configuration(format!(
                "graph_optimization_level must be between 0 and 3, got {}",
                self.graph_optimization_level
            )));
        }

        if self.intra_op_threads == Some(0) {
            return Err(M3EmbedError::configuration(
                "intra_op_threads must be greater than 0",
            ));
        }

        if self.cuda_memory_limit == Some(0) {
            return Err(M3EmbedError::configuration(
                "cuda_memory_limit must be greater than 0 when set",
            ));
        }

        if let Some(ref library) = self.custom_ops_library {
            if !library.is_file() {
                return Err(M3EmbedError::configuration(format!(
                    "custom operator library not found: {}",
                    library.display()
                )));
            }
        }

        Ok(())
    }
}

/// Configuration builder for more ergonomic configuration creation.
#[derive(Debug, Default)]
pub struct EmbedderConfigBuilder {
    config: EmbedderConfig,
}

impl EmbedderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    pub fn fallback_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = ExecutionProvider>,
    {
        self.config.fallback_providers = providers.into_iter().collect();
        self
    }

    pub fn cuda_device_id(mut self, device_id: i32) -> Self {
        self.config.cuda_device_id = device_id;
        self
    }

    pub fn enable_memory_pattern(mut self, enable: bool) -> Self {
        self.config.enable_memory_pattern = enable;
        self
    }

    pub fn enable_cpu_mem_arena(mut self, enable: bool) -> Self {
        self.config.enable_cpu_mem_arena = enable;
        self
    }

    pub fn log_severity_level(mut self, level: i32) -> Self {
        self.config.log_severity_level = level;
        self
    }

    pub fn graph_optimization_level(mut self, level: u8) -> Self {
        self.config.graph_optimization_level = level;
        self
    }

    pub fn intra_op_threads(mut self, threads: usize) -> Self {
        self.config.intra_op_threads = Some(threads);
        self
    }

    pub fn cuda_memory_limit(mut self, limit: usize) -> Self {
        self.config.cuda_memory_limit = Some(limit);
        self
    }

    pub fn custom_ops_library<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.custom_ops_library = Some(path.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EmbedderConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the configuration without validation.
    pub fn build_unchecked(self) -> EmbedderConfig {
        self.config
    }
}
