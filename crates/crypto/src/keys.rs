//! Viewing keys and reencryption authorizations.
//!
//! A viewer holds a secret scalar sk and publishes pk = sk·G2. Their identity
//! is `address_of(pk)`. To ask for a confidential value they sign
//! `authorization_message(domain, pk)` with a BLS signature
//! σ = sk·H(message) in G1, which anyone can check with
//!
//! e(σ, G2) == e(H(message), pk)
//!
//! The domain binds the authorization to one auction instance (or one
//! payment ledger), so it cannot be replayed elsewhere.

use bls12_381::{pairing, G1Projective, G2Affine, G2Projective, Scalar};
use group::Curve;
use rand::{CryptoRng, RngCore};

use vickrey_types::{address_of, authorization_message, Address, G2Point, ViewerAuthorization};

use crate::error::CryptoError;
use crate::sealing::{
    compress_g1, compress_g2, decompress_g1, decompress_g2, hash_to_g1, random_scalar,
};

/// A viewer's private key.
#[derive(Clone)]
pub struct ViewingKey {
    secret: Scalar,
    public: G2Affine,
}

impl std::fmt::Debug for ViewingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewingKey")
            .field("address", &hex::encode(&self.address()[..4]))
            .finish_non_exhaustive()
    }
}

impl ViewingKey {
    /// Generate a fresh viewing key.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_scalar(random_scalar(rng))
    }

    /// Restore a viewing key from its 32-byte secret encoding.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = Scalar::from_bytes(bytes);
        if secret.is_none().into() {
            return Err(CryptoError::InvalidScalar);
        }
        Ok(Self::from_scalar(secret.unwrap()))
    }

    fn from_scalar(secret: Scalar) -> Self {
        let public = (G2Projective::generator() * secret).to_affine();
        Self { secret, public }
    }

    /// Secret encoding, suitable for [`ViewingKey::from_bytes`].
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub(crate) fn secret(&self) -> &Scalar {
        &self.secret
    }

    /// Compressed public key.
    pub fn public_point(&self) -> G2Point {
        compress_g2(&self.public)
    }

    /// Identity controlled by this key.
    pub fn address(&self) -> Address {
        address_of(&self.public_point())
    }

    /// Sign an authorization to view data scoped to `domain`.
    pub fn authorize(&self, domain: &Address) -> ViewerAuthorization {
        let public_key = self.public_point();
        let message = authorization_message(domain, &public_key);
        let h = hash_to_g1(&message);
        let signature = (G1Projective::from(h) * self.secret).to_affine();

        ViewerAuthorization {
            public_key,
            signature: compress_g1(&signature),
        }
    }
}

/// Verify that `authorization` was signed by the holder of its public key for
/// `domain`.
pub fn verify_authorization(
    authorization: &ViewerAuthorization,
    domain: &Address,
) -> Result<(), CryptoError> {
    let pk = decompress_g2(&authorization.public_key.0)?;
    let signature = decompress_g1(&authorization.signature.0)?;

    let message = authorization_message(domain, &authorization.public_key);
    let h = hash_to_g1(&message);

    let lhs = pairing(&signature, &G2Affine::generator());
    let rhs = pairing(&h, &pk);

    if lhs == rhs {
        Ok(())
    } else {
        Err(CryptoError::InvalidAuthorization)
    }
}
