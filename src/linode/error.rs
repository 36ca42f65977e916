//! Error types for the Linode HTTP client.

use thiserror::Error;

/// Errors raised while talking to the Linode API.
///
/// All variants are transport-level failures: the request never produced a
/// usable success payload.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when the request could not be sent or the response not read.
    #[error("{operation} request failed: {message}")]
    Transport {
        /// Operation being performed (for example `list volumes`).
        operation: String,
        /// Message reported by the HTTP client.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        /// Operation being performed.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON error document.
        body: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        /// Operation being performed.
        operation: String,
        /// Parser error message.
        message: String,
    },
}

impl ApiError {
    pub(super) fn transport(operation: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.to_owned(),
            message: err.to_string(),
        }
    }

    /// Returns the HTTP status when the API rejected the request.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}
