//! Pipeline bootstrap from configuration.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sluice_runtime::SluiceRuntime;
//!
//! // Loads sluice.toml from the current directory plus SLUICE_* variables
//! let runtime = SluiceRuntime::builder().build()?;
//!
//! // Or from an already loaded configuration
//! let config = load_config_from_file("config/sluice.toml")?;
//! let runtime = SluiceRuntime::from_config(&config)?;
//!
//! let pipeline = runtime.pipeline();
//! ```

use std::path::Path;
use std::sync::Arc;

use sluice_core::{BoxedExecutor, InlineExecutor, Pipeline, TokioExecutor, WorkerPool};
use tracing::info;

use crate::config::{ConfigLoader, ExecutorConfig, ExecutorKind, SluiceConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A configured [`Pipeline`] together with the configuration it was built from.
#[derive(Debug, Clone)]
pub struct SluiceRuntime {
    config: SluiceConfig,
    pipeline: Pipeline,
}

impl SluiceRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config` and builds a pipeline with the configured executor.
    ///
    /// Logging is left untouched; see [`SluiceRuntime::init_logging`].
    ///
    /// # Errors
    ///
    /// Fails when validation fails, when worker threads cannot be spawned,
    /// or when the `tokio` executor is requested outside a tokio runtime.
    pub fn from_config(config: &SluiceConfig) -> RuntimeResult<Self> {
        validate_config(config)?;

        let executor = build_executor(&config.executor)?;
        let pipeline = Pipeline::builder().shared_executor(executor).build();

        info!(
            executor = %config.executor.kind,
            workers = config.executor.workers,
            "Sluice runtime ready"
        );

        Ok(Self {
            config: config.clone(),
            pipeline,
        })
    }

    /// Installs the global subscriber described by the logging configuration.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init_logging(&self) {
        logging::init_from_config(&self.config.logging);
    }

    /// The configuration this runtime was built from.
    pub fn config(&self) -> &SluiceConfig {
        &self.config
    }

    /// A handle to the pipeline.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline.clone()
    }

    /// Consumes the runtime, returning its pipeline.
    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }
}

fn build_executor(config: &ExecutorConfig) -> RuntimeResult<BoxedExecutor> {
    let executor: BoxedExecutor = match config.kind {
        ExecutorKind::Worker => Arc::new(WorkerPool::new(config.workers, &config.thread_name)?),
        ExecutorKind::Inline => Arc::new(InlineExecutor),
        ExecutorKind::Tokio => Arc::new(TokioExecutor::current().ok_or(RuntimeError::NoTokioRuntime)?),
    };
    Ok(executor)
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading configuration and creating a [`SluiceRuntime`].
///
/// ```rust,ignore
/// let runtime = SluiceRuntime::builder()
///     .config_file("config/sluice.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory, with logging enabled.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SluiceConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Whether `build` installs the configured subscriber (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<SluiceRuntime> {
        let config = self.config_loader.load()?;
        let runtime = SluiceRuntime::from_config(&config)?;
        if self.init_logging {
            runtime.init_logging();
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use sluice_core::{Plain, ServiceType, service_fn};

    struct ThreadName;

    impl ServiceType for ThreadName {
        type Context = ();
        type Result = String;
        type Mode = Plain;
    }

    fn register(pipeline: &Pipeline) {
        pipeline
            .register_service_type::<ThreadName>(service_fn(|_: &()| {
                std::thread::current().name().map(str::to_owned)
            }))
            .unwrap();
    }

    fn config(kind: ExecutorKind) -> SluiceConfig {
        let mut config = SluiceConfig::default();
        config.executor.kind = kind;
        config
    }

    #[test]
    fn test_worker_executor_from_config() {
        let mut config = config(ExecutorKind::Worker);
        config.executor.workers = 2;
        config.executor.thread_name = "runtime-test".to_string();

        let runtime = SluiceRuntime::from_config(&config).unwrap();
        register(&runtime.pipeline());

        let name = runtime
            .pipeline()
            .pump(())
            .through::<ThreadName>()
            .result_async()
            .wait()
            .unwrap();
        assert!(name.starts_with("runtime-test-"));
        assert_eq!(runtime.config(), &config);
    }

    #[test]
    fn test_inline_executor_from_config() {
        let pipeline = SluiceRuntime::from_config(&config(ExecutorKind::Inline))
            .unwrap()
            .into_pipeline();
        register(&pipeline);

        let mut future = pipeline.pump(()).through::<ThreadName>().result_async();
        let caller = std::thread::current().name().map(str::to_owned);
        assert_eq!(future.try_take().map(|r| r.ok()), Some(caller));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config(ExecutorKind::Worker);
        config.executor.workers = 0;
        let err = SluiceRuntime::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_tokio_executor_requires_runtime() {
        let err = SluiceRuntime::from_config(&config(ExecutorKind::Tokio)).unwrap_err();
        assert!(matches!(err, RuntimeError::NoTokioRuntime));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor_from_config() {
        let runtime = SluiceRuntime::from_config(&config(ExecutorKind::Tokio)).unwrap();
        register(&runtime.pipeline());

        let name = runtime
            .pipeline()
            .pump(())
            .through::<ThreadName>()
            .result_async()
            .await
            .unwrap();
        assert!(!name.is_empty());
    }
}
