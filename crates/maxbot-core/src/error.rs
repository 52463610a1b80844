//! Unified error types for the maxbot core.
//!
//! This module provides the error taxonomy shared by the transport and the
//! dispatch core. Framework-level errors (registry, FSM, dispatch) are
//! defined in `maxbot-framework`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised while reaching the bot API over the network.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The shared session has not been opened (or was already closed).
    #[error("session is not initialized")]
    SessionClosed,

    /// The request could not be built or sent.
    #[error("request to {url} failed: {reason}")]
    RequestFailed {
        /// The URL that was requested.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Invalid transport configuration (bad base URL, client build failure).
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised while decoding upstream JSON into domain objects.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A field required to classify the payload is missing or has the wrong type.
    #[error("missing or invalid field '{field}' in {target}")]
    MissingField {
        /// The object being decoded.
        target: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// The JSON did not match the expected shape.
    #[error("failed to decode {target}: {source}")]
    Json {
        /// The object being decoded.
        target: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Wraps a serde error for the given target type.
    pub fn json(target: &'static str, source: serde_json::Error) -> Self {
        Self::Json { target, source }
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code from the response body.
        code: String,
        /// Human-readable message from the response body.
        message: String,
    },

    /// An attachment referenced by the message is still being processed.
    ///
    /// The API reports this with the `attachment.not.ready` code; the call may
    /// succeed if repeated after a short delay.
    #[error("attachment is not ready yet")]
    AttachmentNotReady,

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Returns `true` if repeating the call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AttachmentNotReady)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
