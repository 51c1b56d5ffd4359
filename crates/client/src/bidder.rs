//! Bidder-side key handling.

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use vickrey_crypto::{open, CryptoError, FheBackend, ViewingKey};
use vickrey_types::{Address, Euint64, SealedValue, ViewerAuthorization};

/// Errors that can occur on the bidder side.
#[derive(Debug, Error)]
pub enum BidderError {
    #[error("Could not open sealed value: {0}")]
    Opening(#[from] CryptoError),

    #[error("Sealed value has {got} bytes, expected {expected}")]
    MalformedPlaintext { expected: usize, got: usize },

    #[error("Invalid viewing key")]
    InvalidKey,
}

/// A participant holding a viewing key.
#[derive(Debug)]
pub struct Bidder {
    key: ViewingKey,
}

impl Bidder {
    pub fn new(key: ViewingKey) -> Self {
        Self { key }
    }

    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::new(ViewingKey::generate(rng))
    }

    /// Restore a bidder from a hex-encoded secret.
    pub fn from_hex(secret: &str) -> Result<Self, BidderError> {
        let bytes: [u8; 32] = hex::decode(secret)
            .map_err(|_| BidderError::InvalidKey)?
            .try_into()
            .map_err(|_| BidderError::InvalidKey)?;
        Ok(Self::new(ViewingKey::from_bytes(&bytes)?))
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Identity derived from the viewing key.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// Encrypt a bid amount as a client input.
    pub fn encrypt_bid(fhe: &dyn FheBackend, amount: u64) -> Euint64 {
        fhe.encrypt_u64(amount)
    }

    /// Authorization to read data scoped to `domain` (an auction or a ledger).
    pub fn authorize(&self, domain: &Address) -> ViewerAuthorization {
        self.key.authorize(domain)
    }

    pub fn open_u64(&self, sealed: &SealedValue) -> Result<u64, BidderError> {
        let plaintext = open(sealed, &self.key)?;
        let bytes: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| BidderError::MalformedPlaintext {
                expected: 8,
                got: plaintext.len(),
            })?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn open_bool(&self, sealed: &SealedValue) -> Result<bool, BidderError> {
        match open(sealed, &self.key)?.as_slice() {
            [flag] => Ok(*flag != 0),
            other => Err(BidderError::MalformedPlaintext {
                expected: 1,
                got: other.len(),
            }),
        }
    }
}
