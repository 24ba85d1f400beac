//! Error types for the fluent operation builder.

use crate::scope::ScopeLevel;
use thiserror::Error;

/// Errors reported by a remote resource client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Remote rejected request: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Handle is no longer valid: {0}")]
    InvalidHandle(String),
}

/// Errors surfaced by the operation builder at the call site.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{operation} requires {required:?} scope, but the cursor is at {current:?}")]
    Precondition {
        operation: &'static str,
        required: ScopeLevel,
        current: ScopeLevel,
    },

    #[error("{name} doesn't exist")]
    NotFound { name: String },

    #[error("Batch execution failed with {pending} pending action(s): {source}")]
    BatchExecution {
        pending: usize,
        #[source]
        source: ClientError,
    },

    /// The batch was committed remotely but its outcomes could not be matched
    /// to the actions sent. The queue is cleared; loaded state is unknown.
    #[error("Batch of {sent} action(s) was sent but its outcomes were unusable: {source}")]
    UnconfirmedBatch {
        sent: usize,
        #[source]
        source: ClientError,
    },

    #[error("Remote error: {0}")]
    Remote(#[from] ClientError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl OperationError {
    /// Map a remote lookup failure onto the builder taxonomy, keeping the requested name.
    pub(crate) fn from_lookup(name: &str, err: ClientError) -> Self {
        match err {
            ClientError::NotFound(_) => OperationError::NotFound {
                name: name.to_string(),
            },
            other => OperationError::Remote(other),
        }
    }
}

impl From<config::ConfigError> for OperationError {
    fn from(err: config::ConfigError) -> Self {
        OperationError::ConfigError(err.to_string())
    }
}
