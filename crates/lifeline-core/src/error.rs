//! Error types for Lifeline Core.

use thiserror::Error;

/// Errors produced by core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A persisted status string is not recognized.
    #[error("unknown grant status: {0}")]
    UnknownStatus(String),

    /// The state machine does not allow this move.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: crate::status::GrantStatus,
        to: crate::status::GrantStatus,
    },

    /// A persisted algorithm marker is not recognized.
    #[error("unknown algorithm marker: {0}")]
    UnknownAlgorithm(String),

    /// Wrap version and key algorithm do not belong together.
    #[error("wrap version {version} does not use algorithm {algorithm}")]
    VersionMismatch { version: u16, algorithm: String },

    /// An escrow field has the wrong length.
    #[error("invalid {field}: expected {expected} bytes, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// An artifact field that must not be empty is empty.
    #[error("empty {0}")]
    EmptyField(&'static str),

    /// Token text is not valid.
    #[error("malformed invitation token")]
    MalformedToken,

    /// Encoding error.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// Decoding error.
    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
