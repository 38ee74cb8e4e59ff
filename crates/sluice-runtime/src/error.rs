//! Runtime error types.

use sluice_core::PipelineError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping a pipeline.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline operation failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Dispatch worker threads could not be started.
    #[error("Failed to start dispatch workers: {0}")]
    Executor(#[from] std::io::Error),

    /// The tokio executor was requested outside of a tokio runtime.
    #[error("Executor kind `tokio` requires a running tokio runtime")]
    NoTokioRuntime,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
