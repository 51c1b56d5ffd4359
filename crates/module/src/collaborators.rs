//! Interfaces of the external ledgers an auction settles against.
//!
//! The auction never owns funds or assets directly: it escrows bids in a
//! confidential payment ledger under its own account and moves the auctioned
//! asset through an asset registry on which the owner approved it. Both are
//! injected so tests can substitute doubles.

use std::sync::Arc;

use thiserror::Error;

use vickrey_crypto::{FheBackend, FheError};
use vickrey_types::{Address, Euint64, SealedValue, ViewerAuthorization};

/// Errors reported by the payment ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Transfer failed")]
    TransferFailed,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Encrypted computation failed: {0}")]
    Fhe(#[from] FheError),
}

/// Errors reported by the asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Not owner or not approved")]
    NotOwnerOrNotApproved,

    #[error("Unknown asset: {0}")]
    UnknownAsset(u64),
}

/// Confidential fungible-token ledger used for payments.
pub trait PaymentLedger: Send + Sync {
    /// Move `amount` from `payer` to `spender` against the allowance `payer`
    /// granted to `spender`.
    fn authorize_and_pull(
        &self,
        spender: &Address,
        payer: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `spender`'s own balance to `payee`.
    fn pay_out(&self, spender: &Address, payee: &Address, amount: &Euint64)
        -> Result<(), LedgerError>;

    /// Balance of `owner`, sealed to the key presented in `authorization`.
    fn balance_query(
        &self,
        owner: &Address,
        authorization: &ViewerAuthorization,
    ) -> Result<SealedValue, LedgerError>;
}

/// Non-fungible asset registry holding the auctioned item.
pub trait AssetRegistry: Send + Sync {
    /// Transfer `asset_id` from `from` to `to`, acting as `operator`.
    fn transfer(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        asset_id: u64,
    ) -> Result<(), RegistryError>;

    fn owner_of(&self, asset_id: u64) -> Result<Address, RegistryError>;
}

/// Everything an auction instance computes and settles against.
#[derive(Clone)]
pub struct Collaborators {
    pub fhe: Arc<dyn FheBackend>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub registry: Arc<dyn AssetRegistry>,
}

impl Collaborators {
    pub fn new(
        fhe: Arc<dyn FheBackend>,
        ledger: Arc<dyn PaymentLedger>,
        registry: Arc<dyn AssetRegistry>,
    ) -> Self {
        Self {
            fhe,
            ledger,
            registry,
        }
    }
}
