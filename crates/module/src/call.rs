//! Call message types for the auction module.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use vickrey_types::Euint64;

/// State-changing calls accepted by an auction instance.
///
/// The caller and the time come from the surrounding
/// [`CallContext`](crate::handlers::CallContext).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    /// Submit an encrypted bid. The amount is pulled from the caller's
    /// confidential balance against the allowance granted to the auction.
    Bid { amount: Euint64 },

    /// Close bidding (beneficiary early, anyone after the deadline).
    Stop,

    /// Withdraw the auction before any bid (beneficiary only).
    Cancel,

    /// Collect the caller's refund after bidding closed.
    Claim,

    /// Transfer the asset to the winner and pay the beneficiary.
    AuctionEnd,
}
