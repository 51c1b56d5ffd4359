//! Encrypted bid storage and the oblivious top-two tracker.
//!
//! Every accepted bid runs the same fixed sequence of homomorphic operations
//! against the running top-two, whatever the amounts are:
//!
//! ```text
//! is_new_highest   = amount > highest
//! candidate_second = select(is_new_highest, highest, second)
//! is_new_second    = !is_new_highest & (amount > second)
//! second'          = select(is_new_second, amount, candidate_second)
//! leader'          = select(is_new_highest, slot, leader)
//! highest'         = select(is_new_highest, amount, highest)
//! ```
//!
//! Comparison is strict, so on equal amounts the earlier bidder keeps the lead.
//! The leader is tracked as an encrypted slot index and only decrypted when
//! bidding stops.

use tracing::{debug, info};

use vickrey_crypto::{FheBackend, FheError};
use vickrey_types::{Address, Ebool, Euint64, SealedValue, ViewerAuthorization};

use crate::access::AccessGate;
use crate::collaborators::Collaborators;
use crate::error::AuctionError;
use crate::handlers::{CallContext, HandlerResult};
use crate::lifecycle;
use crate::state::{AuctionRecord, BidRecord, ModuleState, NON_BIDDER_SLOT};

/// New running top-two after one bid.
#[derive(Clone, Copy, Debug)]
pub struct TopTwoUpdate {
    pub highest: Euint64,
    pub second: Euint64,
    pub leader: Euint64,
}

impl TopTwoUpdate {
    fn apply(self, auction: &mut AuctionRecord) {
        auction.highest_bid = self.highest;
        auction.second_highest_bid = self.second;
        auction.leader_slot = self.leader;
    }
}

/// Fold `amount`, bid from `slot`, into the running top-two.
pub fn oblivious_update(
    fhe: &dyn FheBackend,
    auction: &AuctionRecord,
    amount: &Euint64,
    slot: u64,
) -> Result<TopTwoUpdate, FheError> {
    let highest = &auction.highest_bid;
    let second = &auction.second_highest_bid;

    let is_new_highest = fhe.gt(amount, highest)?;
    let candidate_second = fhe.select(&is_new_highest, highest, second)?;

    let beats_second = fhe.gt(amount, second)?;
    let not_new_highest = fhe.not(&is_new_highest)?;
    let is_new_second = fhe.and(&not_new_highest, &beats_second)?;
    let new_second = fhe.select(&is_new_second, amount, &candidate_second)?;

    let slot = fhe.trivial_u64(slot);
    let new_leader = fhe.select(&is_new_highest, &slot, &auction.leader_slot)?;
    let new_highest = fhe.select(&is_new_highest, amount, highest)?;

    Ok(TopTwoUpdate {
        highest: new_highest,
        second: new_second,
        leader: new_leader,
    })
}

/// Accept an encrypted bid from `ctx.sender`.
///
/// The amount is pulled into the auction's escrow account before the bid is
/// recorded. Nothing is written if the pull fails.
pub fn submit_bid(
    state: &mut ModuleState,
    env: &Collaborators,
    ctx: &CallContext,
    amount: Euint64,
) -> HandlerResult<()> {
    lifecycle::ensure_bidding(&state.auction, ctx.timestamp)?;

    if state.bid_of(&ctx.sender).is_some() {
        return Err(AuctionError::DuplicateBid);
    }

    let slot = state.next_slot();
    let update = oblivious_update(env.fhe.as_ref(), &state.auction, &amount, slot)?;

    env.ledger
        .authorize_and_pull(&state.auction.auction_id, &ctx.sender, &amount)?;

    update.apply(&mut state.auction);
    state.insert_bid(BidRecord {
        bidder: ctx.sender,
        slot,
        amount,
        placed_at: ctx.timestamp,
        claimed: false,
    });

    info!(
        auction = %hex::encode(state.auction.auction_id),
        bidder = %hex::encode(ctx.sender),
        slot,
        "Bid accepted"
    );
    debug!(amount = %amount.0, leader = %update.leader.0, "Top-two updated");

    Ok(())
}

/// The requester's own bid, sealed to their viewing key.
pub fn get_bid(
    state: &ModuleState,
    fhe: &dyn FheBackend,
    requester: &Address,
    authorization: &ViewerAuthorization,
) -> HandlerResult<SealedValue> {
    let gate = AccessGate::new(&state.auction.auction_id);
    gate.admit(requester, authorization)?;

    let bid = state.bid_of(requester).ok_or(AuctionError::Unauthorized)?;
    gate.disclose_u64(fhe, &bid.amount, &bid.bidder, requester, authorization)
}

/// Whether the requester currently leads, as an encrypted boolean sealed to
/// their viewing key.
///
/// Requesters who never bid are compared through a slot no bidder occupies,
/// so they get `false` from the same computation.
pub fn am_i_highest_bidder(
    state: &ModuleState,
    fhe: &dyn FheBackend,
    requester: &Address,
    authorization: &ViewerAuthorization,
) -> HandlerResult<SealedValue> {
    let gate = AccessGate::new(&state.auction.auction_id);
    gate.admit(requester, authorization)?;

    let is_leader = is_leader(state, fhe, requester)?;
    Ok(fhe.reencrypt_bool(&is_leader, &authorization.public_key)?)
}

/// `leader_slot == slot(requester)`, under encryption.
pub(crate) fn is_leader(
    state: &ModuleState,
    fhe: &dyn FheBackend,
    requester: &Address,
) -> Result<Ebool, FheError> {
    let slot = state
        .bid_of(requester)
        .map(|bid| bid.slot)
        .unwrap_or(NON_BIDDER_SLOT);
    let slot = fhe.trivial_u64(slot);
    fhe.eq(&state.auction.leader_slot, &slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, fixture, Fixture};
    use rand::rngs::OsRng;
    use vickrey_crypto::{open, ViewingKey};
    use vickrey_types::AuctionState;

    fn bid(fx: &mut Fixture, bidder: Address, value: u64, at: u64) -> HandlerResult<()> {
        let amount = fx.fhe.encrypt_u64(value);
        submit_bid(&mut fx.state, &fx.env, &ctx(bidder, at), amount)
    }

    fn top_two(fx: &Fixture) -> (u64, u64, u64) {
        let auction = &fx.state.auction;
        (
            fx.fhe.decrypt_u64(&auction.highest_bid).unwrap(),
            fx.fhe.decrypt_u64(&auction.second_highest_bid).unwrap(),
            fx.fhe.decrypt_u64(&auction.leader_slot).unwrap(),
        )
    }

    #[test]
    fn test_tracks_top_two() {
        let mut fx = fixture(true);
        bid(&mut fx, [10u8; 32], 10, 1).unwrap();
        bid(&mut fx, [20u8; 32], 20, 2).unwrap();
        bid(&mut fx, [15u8; 32], 15, 3).unwrap();

        assert_eq!(top_two(&fx), (20, 15, 1));
        assert_eq!(fx.state.bid_count(), 3);
    }

    #[test]
    fn test_tie_keeps_earlier_leader() {
        let mut fx = fixture(true);
        bid(&mut fx, [1u8; 32], 50, 1).unwrap();
        bid(&mut fx, [2u8; 32], 50, 2).unwrap();

        assert_eq!(top_two(&fx), (50, 50, 0));
    }

    #[test]
    fn test_zero_bid_never_leads() {
        let mut fx = fixture(true);
        bid(&mut fx, [1u8; 32], 0, 1).unwrap();

        assert_eq!(top_two(&fx), (0, 0, crate::state::NO_LEADER));
    }

    #[test]
    fn test_duplicate_bid_rejected() {
        let mut fx = fixture(true);
        bid(&mut fx, [1u8; 32], 5, 1).unwrap();
        let result = bid(&mut fx, [1u8; 32], 9, 2);

        assert_eq!(result, Err(AuctionError::DuplicateBid));
        assert_eq!(top_two(&fx), (5, 0, 0));
    }

    #[test]
    fn test_bid_after_deadline_rejected() {
        let mut fx = fixture(true);
        let deadline = fx.state.auction.bidding_deadline;
        let result = bid(&mut fx, [1u8; 32], 5, deadline);

        assert_eq!(
            result,
            Err(AuctionError::StateViolation {
                expected: AuctionState::Bidding,
                got: AuctionState::Stopped
            })
        );
        assert_eq!(fx.state.bid_count(), 0);
    }

    #[test]
    fn test_failed_pull_records_nothing() {
        let mut fx = fixture(true);
        fx.ledger.reject_pulls(true);
        let result = bid(&mut fx, [1u8; 32], 5, 1);

        assert_eq!(result, Err(AuctionError::InsufficientAllowance));
        assert_eq!(fx.state.bid_count(), 0);
        assert_eq!(top_two(&fx), (0, 0, crate::state::NO_LEADER));
    }

    #[test]
    fn test_same_work_for_leading_and_losing_bids() {
        let mut fx = fixture(true);
        bid(&mut fx, [1u8; 32], 100, 1).unwrap();

        let high = fx.fhe.encrypt_u64(500);
        let before = fx.fhe.ops_executed();
        let update = oblivious_update(fx.fhe.as_ref(), &fx.state.auction, &high, 1);
        let leading = fx.fhe.ops_executed() - before;
        assert!(update.is_ok());

        let low = fx.fhe.encrypt_u64(3);
        let before = fx.fhe.ops_executed();
        let update = oblivious_update(fx.fhe.as_ref(), &fx.state.auction, &low, 1);
        let losing = fx.fhe.ops_executed() - before;
        assert!(update.is_ok());

        assert_eq!(leading, losing);
    }

    #[test]
    fn test_get_bid_only_for_owner() {
        let mut fx = fixture(true);
        let alice = ViewingKey::generate(&mut OsRng);
        let bob = ViewingKey::generate(&mut OsRng);
        bid(&mut fx, alice.address(), 42, 1).unwrap();

        let domain = fx.state.auction.auction_id;
        let auth = alice.authorize(&domain);
        let sealed = get_bid(&fx.state, fx.fhe.as_ref(), &alice.address(), &auth).unwrap();
        assert_eq!(open(&sealed, &alice).unwrap(), 42u64.to_le_bytes());

        // Bob never bid
        let result = get_bid(&fx.state, fx.fhe.as_ref(), &bob.address(), &bob.authorize(&domain));
        assert_eq!(result, Err(AuctionError::Unauthorized));

        // Bob presenting his key for Alice's identity
        let result = get_bid(&fx.state, fx.fhe.as_ref(), &alice.address(), &bob.authorize(&domain));
        assert_eq!(result, Err(AuctionError::Unauthorized));
    }

    #[test]
    fn test_am_i_highest_bidder() {
        let mut fx = fixture(true);
        let alice = ViewingKey::generate(&mut OsRng);
        let bob = ViewingKey::generate(&mut OsRng);
        let carol = ViewingKey::generate(&mut OsRng);
        bid(&mut fx, alice.address(), 10, 1).unwrap();
        bid(&mut fx, bob.address(), 20, 2).unwrap();

        let domain = fx.state.auction.auction_id;
        let read = |key: &ViewingKey| {
            let auth = key.authorize(&domain);
            let sealed =
                am_i_highest_bidder(&fx.state, fx.fhe.as_ref(), &key.address(), &auth).unwrap();
            open(&sealed, key).unwrap()
        };

        assert_eq!(read(&alice), vec![0u8]);
        assert_eq!(read(&bob), vec![1u8]);
        assert_eq!(read(&carol), vec![0u8]);
    }
}
