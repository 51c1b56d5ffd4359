//! Cryptographic building blocks for confidential auctions.
//!
//! # Overview
//!
//! 1. **Viewing keys** ([`keys`]): each participant holds a BLS12-381 key.
//!    Their identity is the hash of the public key, and they prove ownership
//!    by signing an authorization bound to one auction instance.
//!
//! 2. **Sealing** ([`sealing`]): a value is encrypted to a viewer's public
//!    key with a pairing-derived AES-256-GCM key. This is how confidential
//!    values are disclosed, one viewer at a time.
//!
//! 3. **Encrypted integers** ([`fhe`]): the auction logic computes over
//!    ciphertext handles through the [`FheBackend`] trait. [`MockFhe`] is the
//!    in-process backend used for development and tests.

pub mod error;
pub mod fhe;
pub mod keys;
pub mod mock_fhe;
pub mod sealing;

pub use error::CryptoError;
pub use fhe::{FheBackend, FheError};
pub use keys::{verify_authorization, ViewingKey};
pub use mock_fhe::MockFhe;
pub use sealing::{open, seal};
