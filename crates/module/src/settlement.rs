//! Second-price settlement.
//!
//! Every bidder claims once. The refund is computed under encryption for
//! every claimant with the same operations:
//!
//! ```text
//! is_winner = leader_slot == slot
//! refund    = select(is_winner, amount - second_highest, amount)
//! ```
//!
//! so the winner pays exactly the second price and everyone else gets their
//! full escrow back. `auction_end` hands the asset to the winner and pays the
//! second price to the beneficiary.

use tracing::{info, warn};

use vickrey_crypto::FheBackend;
use vickrey_types::{Address, AuctionState, Euint64, SealedValue, ViewerAuthorization};

use crate::access::AccessGate;
use crate::bid_ledger::is_leader;
use crate::collaborators::Collaborators;
use crate::error::AuctionError;
use crate::handlers::{CallContext, HandlerResult};
use crate::lifecycle::{self, close_bidding};
use crate::state::ModuleState;

/// Outcome of one claim. Derived at claim time, not stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimRecord {
    /// Encrypted amount paid back to the claimant
    pub refund: Euint64,
    /// The claimant won and the asset is already theirs
    pub asset_transferred: bool,
}

/// Outcome of `auction_end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndOutcome {
    /// Asset transferred to the winner and proceeds paid out
    Settled { winner: Address },
    /// Nobody led: the asset stays with its owner
    NoWinner,
    /// The auction was canceled; nothing to settle
    Canceled,
}

/// Pay back `ctx.sender`'s escrow minus what they owe.
pub fn claim(
    state: &mut ModuleState,
    env: &Collaborators,
    ctx: &CallContext,
) -> HandlerResult<ClaimRecord> {
    let fhe = env.fhe.as_ref();
    lifecycle::ensure_settling(state, fhe, ctx.timestamp)?;

    let bid = state.bid_of(&ctx.sender).ok_or(AuctionError::NotABidder)?;
    if bid.claimed {
        return Err(AuctionError::AlreadyClaimed);
    }
    let amount = bid.amount;

    let is_winner = is_leader(state, fhe, &ctx.sender)?;
    let owed_back = fhe.sub(&amount, &state.auction.second_highest_bid)?;
    let refund = fhe.select(&is_winner, &owed_back, &amount)?;

    set_claimed(state, &ctx.sender, true);
    if let Err(e) = env
        .ledger
        .pay_out(&state.auction.auction_id, &ctx.sender, &refund)
    {
        set_claimed(state, &ctx.sender, false);
        warn!(bidder = %hex::encode(ctx.sender), error = %e, "Refund payout failed");
        return Err(e.into());
    }

    info!(
        auction = %hex::encode(state.auction.auction_id),
        bidder = %hex::encode(ctx.sender),
        "Bid claimed"
    );

    Ok(ClaimRecord {
        refund,
        asset_transferred: state.auction.object_claimed
            && state.auction.highest_bidder == Some(ctx.sender),
    })
}

fn set_claimed(state: &mut ModuleState, bidder: &Address, claimed: bool) {
    if let Some(bid) = state.bid_of_mut(bidder) {
        bid.claimed = claimed;
    }
}

/// Finish the auction.
///
/// Settlement happens in two steps, each committed on its own: the asset
/// moves to the winner, then the second price is paid to the beneficiary.
/// A failing step leaves the auction `Stopped` and a later call resumes with
/// the steps not yet done.
pub fn auction_end(
    state: &mut ModuleState,
    env: &Collaborators,
    ctx: &CallContext,
) -> HandlerResult<EndOutcome> {
    match lifecycle::effective_state(&state.auction, ctx.timestamp) {
        AuctionState::Canceled => return Ok(EndOutcome::Canceled),
        AuctionState::Stopped => {}
        got => {
            return Err(AuctionError::StateViolation {
                expected: AuctionState::Stopped,
                got,
            })
        }
    }

    // Stop a lapsed auction on a staged copy; it is committed with the first
    // step that succeeds.
    let mut staged = state.auction.clone();
    if staged.state == AuctionState::Bidding {
        close_bidding(&mut staged, &state.bidders, env.fhe.as_ref())?;
    }

    let Some(winner) = staged.highest_bidder else {
        staged.state = AuctionState::Ended;
        state.auction = staged;
        info!(auction = %hex::encode(state.auction.auction_id), "Auction ended without winner");
        return Ok(EndOutcome::NoWinner);
    };

    if !staged.object_claimed {
        env.registry
            .transfer(&staged.auction_id, &staged.owner, &winner, staged.asset.asset_id)
            .map_err(|e| {
                warn!(error = %e, "Asset transfer failed");
                AuctionError::from(e)
            })?;
        staged.object_claimed = true;
    }
    state.auction = staged;

    let auction = &mut state.auction;
    if !auction.proceeds_paid {
        env.ledger
            .pay_out(&auction.auction_id, &auction.beneficiary, &auction.second_highest_bid)
            .map_err(|e| {
                warn!(error = %e, "Proceeds payout failed");
                AuctionError::from(e)
            })?;
        auction.proceeds_paid = true;
    }

    auction.state = AuctionState::Ended;
    info!(
        auction = %hex::encode(auction.auction_id),
        winner = %hex::encode(winner),
        "Auction ended"
    );
    Ok(EndOutcome::Settled { winner })
}

/// Whether the requester won and received the asset, sealed to their key.
pub fn object_claimed(
    state: &ModuleState,
    fhe: &dyn FheBackend,
    requester: &Address,
    authorization: &ViewerAuthorization,
) -> HandlerResult<SealedValue> {
    let gate = AccessGate::new(&state.auction.auction_id);
    gate.admit(requester, authorization)?;

    let is_winner = is_leader(state, fhe, requester)?;
    let transferred = fhe.trivial_bool(state.auction.object_claimed);
    let claimed = fhe.and(&is_winner, &transferred)?;
    Ok(fhe.reencrypt_bool(&claimed, &authorization.public_key)?)
}
