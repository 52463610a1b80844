//! Error types for the maxbot framework.

use thiserror::Error;

use maxbot_core::{DecodeError, UpdateKind, UserId};

/// Error returned by a user handler.
///
/// Any error type that converts into a boxed error can be returned from a
/// handler, including `anyhow::Error`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type produced by handlers once their return value is normalized.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command name or alias was empty or contained whitespace.
    #[error("invalid command name '{0}': command names must be non-empty and contain no whitespace")]
    InvalidCommandName(String),
}

/// Errors raised by the FSM store.
#[derive(Debug, Error)]
pub enum FsmError {
    /// The requested data key is not set for this user.
    #[error("key '{key}' not found in FSM data of user {user_id}")]
    KeyNotFound {
        /// The user whose data was read.
        user_id: UserId,
        /// The missing key.
        key: String,
    },

    /// The stored value could not be converted to the requested type.
    #[error("failed to decode FSM data key '{key}': {source}")]
    Decode {
        /// The key that was read.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while dispatching a single update.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The raw update could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A handler failed; remaining handlers for the update were skipped.
    #[error("{kind} handler failed: {source}")]
    Handler {
        /// Kind of the update being handled.
        kind: UpdateKind,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// A ready handler failed; later ready handlers were skipped.
    #[error("ready handler failed: {0}")]
    Ready(#[source] HandlerError),
}

impl DispatchError {
    /// Wraps a handler failure for the given update kind.
    pub fn handler(kind: UpdateKind, source: HandlerError) -> Self {
        Self::Handler { kind, source }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for FSM operations.
pub type FsmResult<T> = Result<T, FsmError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
