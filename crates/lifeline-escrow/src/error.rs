//! Error types for the escrow module.

use thiserror::Error;

/// Errors that can occur while wrapping or recovering keys.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Authentication failed: wrong key, wrong context, or tampered bytes.
    #[error("decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    /// Key derivation error.
    #[error("key derivation error: {0}")]
    KeyDerivationError(String),

    /// The artifact uses a format this build cannot open.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Malformed input bytes.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] lifeline_core::CoreError),
}

/// Result type for escrow operations.
pub type Result<T> = std::result::Result<T, EscrowError>;
