//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid G1 point encoding")]
    InvalidG1Point,

    #[error("Invalid G2 point encoding")]
    InvalidG2Point,

    #[error("Invalid scalar encoding")]
    InvalidScalar,

    #[error("Sealing failed: {0}")]
    SealingFailed(String),

    #[error("Opening failed: {0}")]
    OpeningFailed(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Authorization signature verification failed")]
    InvalidAuthorization,

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}
