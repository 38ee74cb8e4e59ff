//! Error types for the service pipeline.
//!
//! Every error is local to one registration or one dispatch call. A failed
//! registration leaves the pipeline exactly as it was, and a failed walk never
//! touches the repository it walked.

use thiserror::Error;

/// Errors produced while registering or dispatching services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The service type was already declared on this pipeline.
    #[error("service of type '{service}' has already been registered")]
    AlreadyRegistered {
        /// Name of the service type.
        service: &'static str,
    },

    /// The service type was never declared on this pipeline.
    #[error("no service registered for type '{service}'")]
    UnknownServiceType {
        /// Name of the service type.
        service: &'static str,
    },

    /// A side-effect or consumer implementation produced no outcome.
    ///
    /// Outcome-producing services must answer either accepted or rejected.
    /// The walk is aborted and no later implementation is tried.
    #[error("implementation '{implementation}' of outcome-producing service '{service}' returned no outcome")]
    ContractViolation {
        /// Name of the service type.
        service: &'static str,
        /// Name of the offending implementation.
        implementation: String,
    },

    /// No implementation, not even the default, produced a result.
    #[error(
        "no implementation of '{service}' consumed the context; \
         the default implementation violated its contract"
    )]
    Exhausted {
        /// Name of the service type.
        service: &'static str,
    },

    /// An asynchronous walk ended without reporting a result.
    #[error("asynchronous dispatch through '{service}' was interrupted before completing")]
    Interrupted {
        /// Name of the service type.
        service: &'static str,
    },
}

impl PipelineError {
    /// Returns the name of the service type the error concerns.
    pub fn service(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { service }
            | Self::UnknownServiceType { service }
            | Self::ContractViolation { service, .. }
            | Self::Exhausted { service }
            | Self::Interrupted { service } => service,
        }
    }

    /// Returns `true` for errors that indicate a broken pipeline configuration
    /// rather than a rejected request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation { .. } | Self::Exhausted { .. }
        )
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
