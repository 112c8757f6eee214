//! The public error taxonomy.
//!
//! Every intent either resolves the state machine forward or returns one
//! of these; nothing escapes the controller as a panic. The same error is
//! recorded into the state snapshot (as `LastError`) before it is
//! returned, so callers may ignore the `Result` and poll the snapshot.

use thiserror::Error;

use super::state::{ErrorKind, LastError, Stage};
use crate::resources::ResourceError;
use crate::transport::{Operation, TransportError};

/// Errors surfaced by pipeline intents.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Rejected locally before any network call (bad extension,
    /// oversized or unreadable file).
    #[error("{message}")]
    Validation { message: String },

    /// Intent dispatched in a stage that forbids it. A usage error,
    /// distinct from anything the server did; the snapshot is untouched.
    #[error("'{intent}' is not valid while the pipeline is {stage}")]
    Sequence { intent: &'static str, stage: Stage },

    /// A remote call exceeded its bound; shorter input may help.
    #[error("{operation} timed out")]
    Timeout { operation: Operation },

    /// The call failed below the HTTP layer.
    #[error("{operation} failed: {message}")]
    Network { operation: Operation, message: String },

    /// The server answered with a failure; carries its detail text when
    /// present.
    #[error("{}", detail.as_deref().unwrap_or(operation.generic_message()))]
    Server {
        operation: Operation,
        detail: Option<String>,
    },

    /// A local media handle or artifact file failed.
    #[error("{message}")]
    Resource { message: String },
}

impl PipelineError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a sequence error for an intent rejected in `stage`.
    pub fn sequence(intent: &'static str, stage: Stage) -> Self {
        Self::Sequence { intent, stage }
    }

    /// Taxonomy discriminant for the state snapshot.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Sequence { .. } => ErrorKind::Sequence,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network { .. } => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::Resource { .. } => ErrorKind::Resource,
        }
    }
}

impl From<&PipelineError> for LastError {
    fn from(error: &PipelineError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<TransportError> for PipelineError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout { operation } => Self::Timeout { operation },
            TransportError::Network { operation, message } => {
                Self::Network { operation, message }
            }
            TransportError::Server {
                operation, detail, ..
            } => Self::Server { operation, detail },
            TransportError::File { .. } | TransportError::Client { .. } => Self::Resource {
                message: error.to_string(),
            },
        }
    }
}

impl From<ResourceError> for PipelineError {
    fn from(error: ResourceError) -> Self {
        Self::Resource {
            message: error.to_string(),
        }
    }
}

/// Result type for pipeline intents.
pub type PipelineResult<T> = Result<T, PipelineError>;
