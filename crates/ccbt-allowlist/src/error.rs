//! Error types for allowlist storage and peer verification.

use thiserror::Error;

/// Primary error type for allowlist operations.
#[derive(Debug, Error)]
pub enum AllowlistError {
    /// A filesystem operation on the allowlist file failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source I/O error.
        #[source]
        source: std::io::Error,
    },
    /// AES-256-GCM encryption or decryption failed.
    #[error("AEAD operation failed: {reason}")]
    Aead {
        /// Human-readable description of the failure.
        reason: &'static str,
    },
    /// The allowlist JSON payload failed to (de)serialize.
    #[error("allowlist payload serialization failed")]
    Serialization(#[from] serde_json::Error),
    /// A supplied key or public key was not exactly 32 bytes.
    #[error("`{field}` must be exactly 32 bytes")]
    InvalidKeyLength {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A supplied Ed25519 signature was not exactly 64 bytes.
    #[error("signature must be exactly 64 bytes")]
    InvalidSignatureLength,
    /// A stored hex-encoded public key failed to decode.
    #[error("stored public key is not valid hex")]
    InvalidStoredKey,
}

/// Convenience alias for allowlist results.
pub type AllowlistResult<T> = Result<T, AllowlistError>;
