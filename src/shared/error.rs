//! Framework Error Types
//!
//! Centralized error handling for command registration and dispatch.
//!
//! Denials are not errors: a gate that rejects an invocation reports a
//! [`Verdict`](crate::application::services::gate_pipeline::Verdict) instead.
//! The variants here either abort registration at startup or fail one
//! invocation in isolation.

use crate::domain::services::argument_format::FormatError;

/// Framework error type
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command `{command}` has no handler attached")]
    MissingHandler { command: String },

    #[error("Invalid format `{format}` on command `{command}`: {source}")]
    InvalidFormat {
        command: String,
        format: String,
        #[source]
        source: FormatError,
    },

    #[error("Unknown middleware `{name}` referenced by `{owner}`")]
    UnknownMiddleware { name: String, owner: String },

    #[error("Unknown afterware `{name}` referenced by `{owner}`")]
    UnknownAfterware { name: String, owner: String },

    #[error("No async runtime available: {0}")]
    MissingRuntime(String),

    #[error("Unexpected platform state: {0}")]
    UnexpectedPlatformState(String),

    #[error("Worker pool has been shut down")]
    PoolShutdown,

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl FrameworkError {
    /// Whether this error is raised while assembling commands rather than while
    /// serving an invocation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FrameworkError::Configuration(_)
                | FrameworkError::Validation(_)
                | FrameworkError::MissingHandler { .. }
                | FrameworkError::InvalidFormat { .. }
                | FrameworkError::UnknownMiddleware { .. }
                | FrameworkError::UnknownAfterware { .. }
                | FrameworkError::MissingRuntime(_)
        )
    }
}

/// Errors reported by the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Channel {0} is unavailable")]
    ChannelUnavailable(i64),

    #[error("Message {0} not found")]
    MessageNotFound(i64),

    #[error("Interaction {0} can no longer be answered")]
    InteractionExpired(i64),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for framework operations
pub type FrameworkResult<T> = Result<T, FrameworkError>;
