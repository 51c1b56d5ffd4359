//! Auction lifecycle: which operations are admissible in which state.
//!
//! ```text
//! Created -> Bidding -> Stopped -> Ended
//!     \         \
//!      `---------`--> Canceled   (beneficiary, before any bid)
//! ```
//!
//! The deadline is observed lazily: once `now >= bidding_deadline` a
//! `Bidding` auction behaves as `Stopped`, and the first operation that needs
//! the stopped state commits the transition along with its own effect.

use tracing::info;

use vickrey_crypto::FheBackend;
use vickrey_types::{Address, AuctionState};

use crate::error::AuctionError;
use crate::handlers::{CallContext, HandlerResult};
use crate::state::{bidder_at, AuctionRecord, ModuleState};

/// State of the auction as seen at `now`.
pub fn effective_state(auction: &AuctionRecord, now: u64) -> AuctionState {
    match auction.state {
        AuctionState::Bidding if now >= auction.bidding_deadline => AuctionState::Stopped,
        state => state,
    }
}

/// `Created -> Bidding`, performed at construction.
pub fn open_bidding(auction: &mut AuctionRecord) {
    if auction.state == AuctionState::Created {
        auction.state = AuctionState::Bidding;
    }
}

/// Bids are admissible only while bidding and before the deadline.
pub fn ensure_bidding(auction: &AuctionRecord, now: u64) -> HandlerResult<()> {
    let got = effective_state(auction, now);
    if got != AuctionState::Bidding {
        return Err(AuctionError::StateViolation {
            expected: AuctionState::Bidding,
            got,
        });
    }
    Ok(())
}

/// Settlement is admissible once bidding stopped. A lapsed deadline is
/// committed here.
pub fn ensure_settling(
    state: &mut ModuleState,
    fhe: &dyn FheBackend,
    now: u64,
) -> HandlerResult<()> {
    match state.auction.state {
        AuctionState::Stopped | AuctionState::Ended => Ok(()),
        AuctionState::Bidding if now >= state.auction.bidding_deadline => {
            close_bidding(&mut state.auction, &state.bidders, fhe)
        }
        _ => Err(AuctionError::StateViolation {
            expected: AuctionState::Stopped,
            got: effective_state(&state.auction, now),
        }),
    }
}

/// Check that the caller may stop bidding now.
pub fn authorize_stop(auction: &AuctionRecord, ctx: &CallContext) -> HandlerResult<()> {
    if auction.state != AuctionState::Bidding {
        return Err(AuctionError::StateViolation {
            expected: AuctionState::Bidding,
            got: auction.state,
        });
    }

    // Past the deadline anyone may close bidding
    if ctx.timestamp >= auction.bidding_deadline {
        return Ok(());
    }

    if ctx.sender != auction.beneficiary {
        return Err(AuctionError::OnlyBeneficiary);
    }
    if !auction.stoppable {
        return Err(AuctionError::NotStoppable);
    }
    Ok(())
}

/// Handle a stop request.
pub fn stop(state: &mut ModuleState, fhe: &dyn FheBackend, ctx: &CallContext) -> HandlerResult<()> {
    authorize_stop(&state.auction, ctx)?;
    close_bidding(&mut state.auction, &state.bidders, fhe)
}

/// `Bidding -> Stopped`.
///
/// This is the only place the leader is decrypted: the slot becomes the
/// public `highest_bidder`. No bid amount is ever decrypted.
pub fn close_bidding(
    auction: &mut AuctionRecord,
    bidders: &[Address],
    fhe: &dyn FheBackend,
) -> HandlerResult<()> {
    let slot = fhe.decrypt_u64(&auction.leader_slot)?;

    auction.highest_bidder = bidder_at(bidders, slot);
    auction.state = AuctionState::Stopped;

    info!(
        auction = %hex::encode(auction.auction_id),
        bids = bidders.len(),
        has_winner = auction.highest_bidder.is_some(),
        "Bidding stopped"
    );
    Ok(())
}

/// Handle a cancel request: only the beneficiary, only before any bid.
pub fn cancel(state: &mut ModuleState, ctx: &CallContext) -> HandlerResult<()> {
    let got = effective_state(&state.auction, ctx.timestamp);
    if !matches!(got, AuctionState::Created | AuctionState::Bidding) {
        return Err(AuctionError::StateViolation {
            expected: AuctionState::Bidding,
            got,
        });
    }
    if ctx.sender != state.auction.beneficiary {
        return Err(AuctionError::OnlyBeneficiary);
    }
    if !state.bids.is_empty() {
        return Err(AuctionError::BidsAlreadyPlaced);
    }

    state.auction.state = AuctionState::Canceled;
    info!(auction = %hex::encode(state.auction.auction_id), "Auction canceled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AuctionParams;
    use vickrey_crypto::MockFhe;
    use vickrey_types::AssetRef;

    const BENEFICIARY: Address = [1u8; 32];
    const STRANGER: Address = [7u8; 32];

    fn setup(stoppable: bool) -> (ModuleState, MockFhe) {
        let fhe = MockFhe::new();
        let params = AuctionParams {
            asset: AssetRef {
                registry: [9u8; 32],
                asset_id: 0,
            },
            beneficiary: BENEFICIARY,
            payment_token: [2u8; 32],
            owner: BENEFICIARY,
            bidding_duration: 1000,
            stoppable,
        };
        let mut auction = AuctionRecord::new(&params, 0, 1000, &fhe);
        open_bidding(&mut auction);
        (ModuleState::new(auction), fhe)
    }

    fn ctx(sender: Address, timestamp: u64) -> CallContext {
        CallContext { sender, timestamp }
    }

    #[test]
    fn test_opens_at_construction() {
        let (state, _) = setup(true);
        assert_eq!(state.auction.state, AuctionState::Bidding);
    }

    #[test]
    fn test_effective_state_after_deadline() {
        let (state, _) = setup(true);
        assert_eq!(effective_state(&state.auction, 999), AuctionState::Bidding);
        assert_eq!(effective_state(&state.auction, 1000), AuctionState::Stopped);
        assert!(ensure_bidding(&state.auction, 1000).is_err());
    }

    #[test]
    fn test_beneficiary_stops_early() {
        let (mut state, fhe) = setup(true);
        stop(&mut state, &fhe, &ctx(BENEFICIARY, 10)).unwrap();
        assert_eq!(state.auction.state, AuctionState::Stopped);
        assert_eq!(state.auction.highest_bidder, None);
    }

    #[test]
    fn test_stranger_cannot_stop_early() {
        let (mut state, fhe) = setup(true);
        let result = stop(&mut state, &fhe, &ctx(STRANGER, 10));
        assert!(matches!(result, Err(AuctionError::OnlyBeneficiary)));
        assert_eq!(state.auction.state, AuctionState::Bidding);
    }

    #[test]
    fn test_not_stoppable_before_deadline() {
        let (mut state, fhe) = setup(false);
        let result = stop(&mut state, &fhe, &ctx(BENEFICIARY, 10));
        assert!(matches!(result, Err(AuctionError::NotStoppable)));
    }

    #[test]
    fn test_anyone_stops_after_deadline() {
        let (mut state, fhe) = setup(false);
        stop(&mut state, &fhe, &ctx(STRANGER, 1000)).unwrap();
        assert_eq!(state.auction.state, AuctionState::Stopped);
    }

    #[test]
    fn test_second_stop_rejected() {
        let (mut state, fhe) = setup(true);
        stop(&mut state, &fhe, &ctx(BENEFICIARY, 10)).unwrap();
        let result = stop(&mut state, &fhe, &ctx(BENEFICIARY, 11));
        assert!(matches!(
            result,
            Err(AuctionError::StateViolation {
                expected: AuctionState::Bidding,
                got: AuctionState::Stopped
            })
        ));
    }

    #[test]
    fn test_settling_commits_lapsed_deadline() {
        let (mut state, fhe) = setup(true);
        assert!(ensure_settling(&mut state, &fhe, 10).is_err());
        ensure_settling(&mut state, &fhe, 1000).unwrap();
        assert_eq!(state.auction.state, AuctionState::Stopped);
    }

    #[test]
    fn test_cancel_rules() {
        let (mut state, _) = setup(true);
        assert!(matches!(
            cancel(&mut state, &ctx(STRANGER, 10)),
            Err(AuctionError::OnlyBeneficiary)
        ));
        cancel(&mut state, &ctx(BENEFICIARY, 10)).unwrap();
        assert_eq!(state.auction.state, AuctionState::Canceled);
        assert!(cancel(&mut state, &ctx(BENEFICIARY, 11)).is_err());
    }
}
