//! Auction module error types.

use thiserror::Error;

use vickrey_crypto::FheError;
use vickrey_types::AuctionState;

use crate::collaborators::{LedgerError, RegistryError};
use crate::params::AuctionParamsError;

/// Errors that can occur in the auction module.
///
/// Every error is a rejected operation: the auction instance is left exactly
/// as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Operation not admissible. Expected: {expected:?}, Got: {got:?}")]
    StateViolation {
        expected: AuctionState,
        got: AuctionState,
    },

    #[error("Already submitted bid")]
    DuplicateBid,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Already claimed")]
    AlreadyClaimed,

    #[error("Caller has not bid in this auction")]
    NotABidder,

    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Transfer failed")]
    TransferFailed,

    #[error("Not owner or not approved")]
    NotOwnerOrNotApproved,

    #[error("Unknown asset: {0}")]
    UnknownAsset(u64),

    #[error("Only the beneficiary can perform this action")]
    OnlyBeneficiary,

    #[error("Auction cannot be stopped before its deadline")]
    NotStoppable,

    #[error("Bids already placed")]
    BidsAlreadyPlaced,

    #[error("Invalid auction parameters: {0}")]
    InvalidParams(#[from] AuctionParamsError),

    #[error("Encrypted computation failed: {0}")]
    Fhe(#[from] FheError),
}

impl From<LedgerError> for AuctionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientAllowance => AuctionError::InsufficientAllowance,
            LedgerError::TransferFailed => AuctionError::TransferFailed,
            LedgerError::Unauthorized => AuctionError::Unauthorized,
            LedgerError::Fhe(e) => AuctionError::Fhe(e),
        }
    }
}

impl From<RegistryError> for AuctionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotOwnerOrNotApproved => AuctionError::NotOwnerOrNotApproved,
            RegistryError::UnknownAsset(id) => AuctionError::UnknownAsset(id),
        }
    }
}
