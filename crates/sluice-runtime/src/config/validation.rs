//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ExecutorConfig, ExecutorKind, LogOutput, LoggingConfig, SluiceConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SluiceConfig) -> ConfigResult<()> {
    validate_executor_config(&config.executor)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates executor configuration.
fn validate_executor_config(executor: &ExecutorConfig) -> ConfigResult<()> {
    // Worker settings are ignored by the other kinds
    if executor.kind != ExecutorKind::Worker {
        return Ok(());
    }

    if executor.workers == 0 {
        return Err(ConfigError::validation(
            "Executor workers must be greater than 0",
        ));
    }

    if executor.thread_name.trim().is_empty() {
        return Err(ConfigError::missing_field("executor.thread_name"));
    }

    if executor.thread_name.contains('\0') {
        return Err(ConfigError::validation(
            "Executor thread name cannot contain NUL bytes",
        ));
    }

    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_validate_default_config() {
        let config = SluiceConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = SluiceConfig::default();
        config.executor.workers = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_zero_workers_ignored_for_inline() {
        let mut config = SluiceConfig::default();
        config.executor.kind = ExecutorKind::Inline;
        config.executor.workers = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_thread_name() {
        let mut config = SluiceConfig::default();
        config.executor.thread_name = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = SluiceConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("sluice.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_filter_target() {
        let mut config = SluiceConfig::default();
        config.logging.filters.insert(String::new(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
