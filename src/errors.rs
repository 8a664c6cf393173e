//! Client error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Transport and
//! parse failures are returned as values so callers can branch on them;
//! nothing in the crate panics on a network or decode problem.

use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration, detected before any network I/O.
    #[error("configuration error: {reason}")]
    Config {
        reason: String,
    },

    /// Caller-supplied input has an unusable shape, detected before any
    /// network I/O.
    #[error("invalid input: {reason}")]
    InvalidInput {
        reason: String,
    },

    /// An image reference could not be resolved to base64 data.
    #[error("image resolution failed for {reference}: {reason}")]
    InvalidImage {
        reference: String,
        reason: String,
    },

    /// The non-streaming request did not complete within the read timeout.
    #[error("Request timeout: {reason}")]
    Timeout {
        reason: String,
    },

    /// The non-streaming request failed at the transport level.
    #[error("Request failed: {reason}")]
    RequestFailed {
        reason: String,
    },

    /// The streaming request failed at the transport level, during connect
    /// or mid-body.
    #[error("Stream failed: {reason}")]
    StreamFailed {
        reason: String,
    },

    /// One newline-delimited stream record was not valid JSON. Recoverable;
    /// subsequent records are still decoded.
    #[error("failed to parse stream line: {reason}")]
    LineParse {
        line: String,
        reason: String,
    },

    /// The server returned a response with no body.
    #[error("Empty response")]
    EmptyResponse,

    /// The non-streaming response body was not valid JSON. Carries the raw
    /// body for diagnostics.
    #[error("Failed to parse response: {reason}")]
    ResponseParse {
        reason: String,
        raw: String,
    },

    /// The model listing request failed or returned a non-JSON body.
    #[error("Failed to list models: {reason}")]
    ListModels {
        reason: String,
    },
}

impl ClientError {
    /// Check if this error describes a network or parse failure.
    ///
    /// Recoverable errors describe something the server or network did;
    /// non-recoverable ones describe caller misuse (bad input shape,
    /// missing configuration) and are raised before any request is sent.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ClientError::Config { .. }
                | ClientError::InvalidInput { .. }
                | ClientError::InvalidImage { .. }
        )
    }

    /// Extract the raw response body, if this is a `ResponseParse` error.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            ClientError::ResponseParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
