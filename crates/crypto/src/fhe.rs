//! Encrypted-integer abstraction consumed by the auction logic.
//!
//! Values live inside a backend and are referenced by opaque [`Handle`]s.
//! Every operation produces a fresh handle; none of them reveals its inputs.
//! Arithmetic wraps modulo 2^64, as homomorphic integer types do.
//!
//! Decryption is reserved for values that are meant to become public (for
//! example the winning slot once bidding closes). Confidential reads go
//! through [`FheBackend::reencrypt_u64`] / [`FheBackend::reencrypt_bool`],
//! which seal the value to a single viewer's key.

use thiserror::Error;

use vickrey_types::{Ebool, Euint64, G2Point, Handle, SealedValue};

use crate::error::CryptoError;

/// Errors reported by an FHE backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FheError {
    #[error("Unknown ciphertext handle {0}")]
    UnknownHandle(Handle),

    #[error("Ciphertext {0} has the wrong type")]
    TypeMismatch(Handle),

    #[error("Reencryption failed: {0}")]
    Reencryption(#[from] CryptoError),
}

/// Homomorphic operations over encrypted 64-bit integers and booleans.
pub trait FheBackend: Send + Sync {
    /// Encrypt a client-supplied value (a bidder's input ciphertext).
    fn encrypt_u64(&self, value: u64) -> Euint64;

    /// Encrypt a public constant.
    fn trivial_u64(&self, value: u64) -> Euint64;

    /// Encrypt a public boolean constant.
    fn trivial_bool(&self, value: bool) -> Ebool;

    fn add(&self, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError>;

    fn sub(&self, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError>;

    fn gt(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError>;

    fn ge(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError>;

    fn eq(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError>;

    fn and(&self, a: &Ebool, b: &Ebool) -> Result<Ebool, FheError>;

    fn not(&self, a: &Ebool) -> Result<Ebool, FheError>;

    /// Oblivious selection: `a` if `cond` else `b`, with both sides evaluated.
    fn select(&self, cond: &Ebool, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError>;

    /// Seal an integer to one viewer's public key.
    fn reencrypt_u64(&self, value: &Euint64, viewer: &G2Point) -> Result<SealedValue, FheError>;

    /// Seal a boolean to one viewer's public key.
    fn reencrypt_bool(&self, value: &Ebool, viewer: &G2Point) -> Result<SealedValue, FheError>;

    /// Public decryption of an integer.
    fn decrypt_u64(&self, value: &Euint64) -> Result<u64, FheError>;

    /// Public decryption of a boolean.
    fn decrypt_bool(&self, value: &Ebool) -> Result<bool, FheError>;
}
