use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("Out of memory")]
    OutOfMemory,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StatusError {
    pub fn error_label(&self) -> &'static str {
        match self {
            StatusError::OutOfMemory => "out_of_memory",
            StatusError::InvalidArgument(_) => "invalid_argument",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StatusError::InvalidArgument(message.into())
    }
}

impl From<TryReserveError> for StatusError {
    fn from(_: TryReserveError) -> Self {
        StatusError::OutOfMemory
    }
}

/// Reasons a persisted blob could not be decoded.
///
/// Only [`DecodeError::OutOfMemory`] reaches callers of
/// [`StatusRecord::from_bytes`](super::StatusRecord::from_bytes); every other
/// variant degrades to a fresh record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Status blob too short: {len} bytes, need at least {min}")]
    Undersized { len: usize, min: usize },

    #[error("Status blob truncated in {field}: need {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Access token is not valid UTF-8")]
    TokenEncoding,

    #[error("Access token contains a NUL byte")]
    TokenNul,

    #[error("Out of memory")]
    OutOfMemory,
}

impl From<TryReserveError> for DecodeError {
    fn from(_: TryReserveError) -> Self {
        DecodeError::OutOfMemory
    }
}
