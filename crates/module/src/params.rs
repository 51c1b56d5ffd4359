//! Construction parameters for an auction instance.

use serde::{Deserialize, Serialize};

use vickrey_types::{Address, AssetRef};

/// Parameters handed over by the factory when an auction is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionParams {
    /// The auctioned item
    pub asset: AssetRef,
    /// Receives the proceeds (the second price)
    pub beneficiary: Address,
    /// Confidential ledger bids are paid in
    pub payment_token: Address,
    /// Current holder of the asset, who approved the auction to move it
    pub owner: Address,
    /// Seconds from creation until bidding closes
    pub bidding_duration: u64,
    /// Whether the beneficiary may close bidding early
    pub stoppable: bool,
}

impl AuctionParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), AuctionParamsError> {
        if self.bidding_duration == 0 {
            return Err(AuctionParamsError::ZeroDuration);
        }
        if self.beneficiary == [0u8; 32] {
            return Err(AuctionParamsError::MissingIdentity("beneficiary"));
        }
        if self.owner == [0u8; 32] {
            return Err(AuctionParamsError::MissingIdentity("owner"));
        }
        if self.payment_token == [0u8; 32] {
            return Err(AuctionParamsError::MissingIdentity("payment_token"));
        }
        Ok(())
    }

    /// Absolute bidding deadline for an auction created at `created_at`.
    pub fn deadline(&self, created_at: u64) -> Result<u64, AuctionParamsError> {
        created_at
            .checked_add(self.bidding_duration)
            .ok_or(AuctionParamsError::DeadlineOverflow)
    }
}

/// Errors that can occur during parameter validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuctionParamsError {
    #[error("Bidding duration cannot be zero")]
    ZeroDuration,

    #[error("Missing identity: {0}")]
    MissingIdentity(&'static str),

    #[error("Bidding deadline overflows")]
    DeadlineOverflow,
}
