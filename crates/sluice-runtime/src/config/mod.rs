//! Configuration module for the Sluice runtime.
//!
//! This module provides layered configuration loading and validation for
//! the dispatch executor and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ExecutorConfig, ExecutorKind, LogFormat, LogLevel, LogOutput, LoggingConfig, SluiceConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
