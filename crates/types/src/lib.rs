//! Core type definitions for confidential second-price auctions.
//!
//! This crate provides the shared data structures used across the auction system:
//! curve point encodings, ciphertext handles, sealed (reencrypted) values,
//! viewer authorizations, the auction lifecycle and its events.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Compressed G2 point on BLS12-381 (96 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 96]")] pub [u8; 96]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 96])
    }
}

/// Identifier of a ciphertext held by an FHE backend.
///
/// A handle carries no information about the value it refers to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Handle(pub [u8; 32]);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Encrypted unsigned 64-bit integer.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Euint64(pub Handle);

/// Encrypted boolean.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct Ebool(pub Handle);

/// A plaintext sealed to one viewer's public key.
///
/// Only the holder of the matching viewing key can open it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SealedValue {
    /// Ephemeral public key: U = r·G2
    pub ephemeral_pubkey: G2Point,

    /// AES-256-GCM encrypted payload
    pub ciphertext: Vec<u8>,

    /// Authentication tag
    pub tag: [u8; 16],

    /// Nonce for AEAD
    pub nonce: [u8; 12],
}

/// Proof that the holder of `public_key` asks to view data scoped to one domain
/// (an auction instance or a payment ledger).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ViewerAuthorization {
    /// Viewer's public key (pk = sk·G2)
    pub public_key: G2Point,
    /// BLS signature sk·H(authorization_message(domain, pk))
    pub signature: G1Point,
}

// =========================
// AUCTION TYPES
// =========================

/// Generic identity type (32 bytes)
pub type Address = [u8; 32];

/// Reference to a non-fungible asset held in an external registry.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AssetRef {
    pub registry: Address,
    pub asset_id: u64,
}

/// Auction lifecycle state
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionState {
    /// Constructed, bidding not yet opened
    Created,
    /// Accepting bids
    Bidding,
    /// Bids locked, settlement open
    Stopped,
    /// Asset transferred and proceeds paid
    Ended,
    /// Withdrawn by the beneficiary before any bid
    Canceled,
}

/// Events emitted by an auction instance. None of them carry amounts.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    BidPlaced { bidder: Address },
    AuctionStopped,
    AuctionEnded,
    AuctionCanceled,
    Claimed { bidder: Address },
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute the instance identity of an auction from its constructor parameters.
///
/// The identity doubles as the auction's escrow account in the payment ledger
/// and as the domain of every viewer authorization addressed to it.
pub fn compute_auction_id(
    asset: &AssetRef,
    beneficiary: &Address,
    payment_token: &Address,
    owner: &Address,
    bidding_deadline: u64,
    stoppable: bool,
    created_at: u64,
) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"VICKREY_AUCTION_ID_V1:");
    hasher.update(asset.registry);
    hasher.update(asset.asset_id.to_le_bytes());
    hasher.update(beneficiary);
    hasher.update(payment_token);
    hasher.update(owner);
    hasher.update(bidding_deadline.to_le_bytes());
    hasher.update([stoppable as u8]);
    hasher.update(created_at.to_le_bytes());
    hasher.finalize().into()
}

/// Derive the identity owning a viewing public key.
pub fn address_of(public_key: &G2Point) -> Address {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"VICKREY_ADDRESS_V1:");
    hasher.update(public_key.0);
    hasher.finalize().into()
}

/// Message a viewer signs to authorize reencryption within `domain`.
pub fn authorization_message(domain: &Address, public_key: &G2Point) -> Vec<u8> {
    let mut message = Vec::with_capacity(24 + 32 + 96);
    message.extend_from_slice(b"VICKREY_REENCRYPT_V1:");
    message.extend_from_slice(domain);
    message.extend_from_slice(&public_key.0);
    message
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetRef {
        AssetRef {
            registry: [9u8; 32],
            asset_id: 0,
        }
    }

    #[test]
    fn test_compute_auction_id() {
        let id1 = compute_auction_id(&asset(), &[1u8; 32], &[2u8; 32], &[1u8; 32], 100, true, 0);
        let id2 = compute_auction_id(&asset(), &[1u8; 32], &[2u8; 32], &[1u8; 32], 101, true, 0);
        let id3 = compute_auction_id(&asset(), &[1u8; 32], &[2u8; 32], &[1u8; 32], 100, false, 0);
        let id4 = compute_auction_id(&asset(), &[1u8; 32], &[2u8; 32], &[1u8; 32], 100, true, 0);

        assert_ne!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, id4);
    }

    #[test]
    fn test_address_depends_on_key() {
        let a = address_of(&G2Point([1u8; 96]));
        let b = address_of(&G2Point([2u8; 96]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorization_message_binds_domain() {
        let pk = G2Point([7u8; 96]);
        assert_ne!(
            authorization_message(&[1u8; 32], &pk),
            authorization_message(&[2u8; 32], &pk)
        );
    }

    #[test]
    fn test_sealed_value_serialization() {
        let sealed = SealedValue {
            ephemeral_pubkey: G2Point([3u8; 96]),
            ciphertext: vec![1, 2, 3],
            tag: [4u8; 16],
            nonce: [5u8; 12],
        };
        let encoded = borsh::to_vec(&sealed).unwrap();
        let decoded: SealedValue = borsh::from_slice(&encoded).unwrap();
        assert_eq!(sealed, decoded);
    }

    #[test]
    fn test_handle_display_is_short_hex() {
        let handle = Handle([0xab; 32]);
        assert_eq!(handle.to_string(), "abababababababab");
    }
}
