//! Sluice Runtime - Configuration and bootstrap for the Sluice service pipeline.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `SluiceConfig`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - Pipeline bootstrap from configuration (`SluiceRuntime`)
//!
//! ```ignore
//! use sluice_runtime::SluiceRuntime;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Loads sluice.toml and SLUICE_* variables, then sets up logging
//!     let runtime = SluiceRuntime::builder().build()?;
//!     let pipeline = runtime.pipeline();
//!
//!     pipeline.register_service_type::<Greeting>(service_fn(|s: &String| Some(s.len() as i32)))?;
//!     pipeline.register_collected()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ExecutorConfig, ExecutorKind, LogFormat, LogLevel,
    LogOutput, LoggingConfig, Profile, SluiceConfig, SpanEventConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};
pub use runtime::{RuntimeBuilder, SluiceRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
