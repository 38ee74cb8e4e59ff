//! Logging setup for Sluice.
//!
//! Built on `tracing` and `tracing-subscriber`. Every dispatch runs inside a
//! `dispatch` span, so enabling span events shows each walk's lifecycle.
//!
//! ```rust,ignore
//! use sluice_runtime::logging::LoggingBuilder;
//!
//! // What `SluiceRuntime` does with the `[logging]` table
//! LoggingBuilder::from_config(&config.logging).init();
//!
//! // Or by hand
//! LoggingBuilder::new().directive("sluice_core=trace").init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging from a `LoggingConfig`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |span, (_, event)| span | event)
}

/// A builder for the global subscriber.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    span_events: SpanEventConfig,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
}

impl LoggingBuilder {
    /// Compact output on stdout at `INFO`.
    pub fn new() -> Self {
        Self {
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            ..Default::default()
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        // Sorted so the resulting filter does not depend on map order
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            directives: filters
                .into_iter()
                .map(|(target, level)| format!("{target}={}", level.as_str()))
                .collect(),
            level: Some(config.level.to_tracing_level()),
            span_events: config.span_events.clone(),
            format: config.format,
            output: config.output,
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            file_path: config.file_path.clone(),
        }
    }

    /// Add a filter directive, e.g. `"sluice_core=trace"`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base_level = self.level.unwrap_or(tracing::Level::INFO);

        // RUST_LOG wins over the configured base level
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(base_level.as_str().to_lowercase()));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(err) => warn!(directive, error = %err, "Ignoring invalid log directive"),
            }
        }

        filter
    }

    fn make_writer(&self) -> BoxMakeWriter {
        match (&self.output, &self.file_path) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_else(|| OsStr::new("sluice.log")),
            )),
            (LogOutput::File, None) => {
                warn!("File output requested but no file path configured, falling back to stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn build_layer(&self) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(self.make_writer())
            .with_span_events(fmt_span(&self.span_events))
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        }
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    pub fn try_init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.build_layer())
            .with(self.build_filter())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_fmt_span() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
        let full = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&full), FmtSpan::FULL);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            thread_ids: true,
            file_location: true,
            ..Default::default()
        };
        config.span_events.close = true;
        config.filters.insert("sluice_core".to_string(), LogLevel::Trace);
        config.filters.insert("figment".to_string(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(tracing::Level::DEBUG));
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.output, LogOutput::Stderr);
        assert!(builder.thread_ids && builder.file_location);
        assert_eq!(builder.span_events, config.span_events);
        assert_eq!(builder.directives, vec!["figment=warn", "sluice_core=trace"]);
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Compact, LogFormat::Full, LogFormat::Pretty, LogFormat::Json] {
            let builder = LoggingBuilder {
                format,
                output: LogOutput::Stderr,
                ..LoggingBuilder::new()
            };
            let _ = builder.build_layer();
        }
    }

    #[test]
    fn test_file_output() {
        let dir = std::env::temp_dir().join(format!("sluice-log-{}", std::process::id()));
        let builder = LoggingBuilder {
            output: LogOutput::File,
            file_path: Some(dir.join("dispatch.log")),
            ..LoggingBuilder::new()
        };
        let _ = builder.build_layer();
        assert!(dir.join("dispatch.log").exists());
        let _ = std::fs::remove_dir_all(&dir);

        // Without a path the writer falls back to stdout
        let builder = LoggingBuilder {
            output: LogOutput::File,
            ..LoggingBuilder::new()
        };
        let _ = builder.build_layer();
    }

    #[test]
    fn test_second_init_fails() {
        // Either call may be the first one in this test binary to install a subscriber.
        let _ = LoggingBuilder::new().try_init();
        assert!(LoggingBuilder::new().try_init().is_err());
    }
}
