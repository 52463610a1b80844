//! Runtime error types.

use thiserror::Error;

use maxbot_core::{ApiError, TransportError};
use maxbot_framework::{DispatchError, RegistryError};

use crate::config::ConfigError;
use crate::polling::PollState;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A handler registration was rejected.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An update could not be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The polling loop can only be started from the idle state.
    #[error("polling loop cannot start: it is {0}")]
    AlreadyStarted(PollState),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
