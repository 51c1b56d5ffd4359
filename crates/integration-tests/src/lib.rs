//! End-to-end integration tests for confidential second-price auctions.
//!
//! These tests exercise the full auction lifecycle against the mock payment
//! ledger and asset registry:
//! 1. Auction creation and asset approval
//! 2. Encrypted bid submission with escrow
//! 3. Stop and winner reveal
//! 4. Encrypted refunds and settlement
//! 5. Confidential reads through viewer authorizations

use rand::rngs::OsRng;
use std::thread;

use vickrey_client::Bidder;
use vickrey_crypto::FheBackend;
use vickrey_mock_ledger::MockWorld;
use vickrey_module::{
    AssetRegistry, AuctionCall, AuctionError, AuctionParams, CallContext, EndOutcome, HandlerResult,
    PaymentLedger, SharedAuction, VickreyAuction,
};
use vickrey_types::{Address, AssetRef, AuctionEvent, AuctionState};

const ASSET_ID: u64 = 1;
const DURATION: u64 = 1000;
const FUNDS: u64 = 100;

struct Harness {
    world: MockWorld,
    auction: VickreyAuction,
    beneficiary: Bidder,
}

impl Harness {
    fn new(stoppable: bool) -> Self {
        let world = MockWorld::new();
        let beneficiary = Bidder::generate(&mut OsRng);
        let auction = create_auction(&world, &beneficiary, stoppable, 0);
        Self {
            world,
            auction,
            beneficiary,
        }
    }

    /// Fund `bidder`, approve the auction and bid `amount`.
    fn place(&mut self, bidder: &Address, amount: u64, at: u64) -> HandlerResult<()> {
        self.world.token.mint(bidder, FUNDS)?;
        let amount = self.world.fhe.encrypt_u64(amount);
        self.world
            .token
            .approve(bidder, &self.auction.auction_id(), amount);
        self.auction.bid(&ctx(*bidder, at), amount)
    }

    fn stop(&mut self) {
        let call = ctx(self.beneficiary.address(), 500);
        self.auction.stop(&call).unwrap();
    }

    /// Balance read in the clear from the mock backend.
    fn balance(&self, owner: &Address) -> u64 {
        self.world
            .fhe
            .decrypt_u64(&self.world.token.balance_of(owner))
            .unwrap()
    }

    /// Balance read the way a participant does: sealed to their key.
    fn sealed_balance(&self, bidder: &Bidder) -> u64 {
        let ledger = self.world.token.ledger_id();
        let sealed = self
            .world
            .token
            .balance_query(&bidder.address(), &bidder.authorize(&ledger))
            .unwrap();
        bidder.open_u64(&sealed).unwrap()
    }

    fn top_two(&self) -> (u64, u64) {
        let record = self.auction.record();
        (
            self.world.fhe.decrypt_u64(&record.highest_bid).unwrap(),
            self.world.fhe.decrypt_u64(&record.second_highest_bid).unwrap(),
        )
    }
}

fn create_auction(
    world: &MockWorld,
    beneficiary: &Bidder,
    stoppable: bool,
    created_at: u64,
) -> VickreyAuction {
    let owner = beneficiary.address();
    let asset_id = ASSET_ID + created_at;
    world.registry.mint(asset_id, &owner);

    let params = AuctionParams {
        asset: AssetRef {
            registry: world.registry.registry_id(),
            asset_id,
        },
        beneficiary: beneficiary.address(),
        payment_token: world.token.ledger_id(),
        owner,
        bidding_duration: DURATION,
        stoppable,
    };
    let auction = VickreyAuction::new(params, created_at, world.collaborators()).unwrap();
    world
        .registry
        .set_approval_for_all(&owner, &auction.auction_id(), true);
    auction
}

fn ctx(sender: Address, timestamp: u64) -> CallContext {
    CallContext { sender, timestamp }
}

fn addr(i: u8) -> Address {
    [i; 32]
}

/// All orderings of `items` (Heap's algorithm).
fn permutations(items: &[u64]) -> Vec<Vec<u64>> {
    fn heap(k: usize, items: &mut Vec<u64>, out: &mut Vec<Vec<u64>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        heap(k - 1, items, out);
        for i in 0..k - 1 {
            let j = if k % 2 == 0 { i } else { 0 };
            items.swap(j, k - 1);
            heap(k - 1, items, out);
        }
    }

    let mut out = Vec::new();
    heap(items.len(), &mut items.to_vec(), &mut out);
    out
}

/// Test the two-bidder flow end to end: bids 10 and 20.
#[test]
fn test_full_auction_flow() {
    // ========================================
    // Phase 1: Setup
    // ========================================

    let mut h = Harness::new(true);
    let alice = Bidder::generate(&mut OsRng);
    let bob = Bidder::generate(&mut OsRng);
    let domain = h.auction.auction_id();

    // ========================================
    // Phase 2: Bidding
    // ========================================

    h.place(&alice.address(), 10, 10).unwrap();
    h.place(&bob.address(), 20, 20).unwrap();
    assert_eq!(h.sealed_balance(&alice), 90);
    assert_eq!(h.sealed_balance(&bob), 80);

    let sealed = h.auction.get_bid(&alice.address(), &alice.authorize(&domain)).unwrap();
    assert_eq!(alice.open_u64(&sealed).unwrap(), 10);
    let sealed = h.auction.get_bid(&bob.address(), &bob.authorize(&domain)).unwrap();
    assert_eq!(bob.open_u64(&sealed).unwrap(), 20);

    // ========================================
    // Phase 3: Stop
    // ========================================

    h.stop();
    assert_eq!(h.auction.state(500), AuctionState::Stopped);
    assert_eq!(h.auction.highest_bidder(), Some(bob.address()));
    assert_eq!(h.top_two(), (20, 10));

    // ========================================
    // Phase 4: Claims and settlement
    // ========================================

    let record = h.auction.claim(&ctx(alice.address(), 600)).unwrap();
    assert_eq!(h.world.fhe.decrypt_u64(&record.refund).unwrap(), 10);
    let record = h.auction.claim(&ctx(bob.address(), 600)).unwrap();
    assert_eq!(h.world.fhe.decrypt_u64(&record.refund).unwrap(), 10);

    let outcome = h.auction.auction_end(&ctx(alice.address(), 700)).unwrap();
    assert_eq!(
        outcome,
        EndOutcome::Settled {
            winner: bob.address()
        }
    );

    // Winner pays the second price, the loser is made whole
    assert_eq!(h.sealed_balance(&alice), FUNDS);
    assert_eq!(h.sealed_balance(&bob), FUNDS - 20 + 10);
    assert_eq!(h.sealed_balance(&h.beneficiary), 10);
    assert_eq!(h.balance(&domain), 0);
    assert_eq!(h.world.registry.owner_of(ASSET_ID).unwrap(), bob.address());

    let sealed = h.auction.object_claimed(&bob.address(), &bob.authorize(&domain)).unwrap();
    assert!(bob.open_bool(&sealed).unwrap());
    let sealed = h
        .auction
        .object_claimed(&alice.address(), &alice.authorize(&domain))
        .unwrap();
    assert!(!alice.open_bool(&sealed).unwrap());

    assert_eq!(
        h.auction.events(),
        &[
            AuctionEvent::BidPlaced {
                bidder: alice.address()
            },
            AuctionEvent::BidPlaced { bidder: bob.address() },
            AuctionEvent::AuctionStopped,
            AuctionEvent::Claimed {
                bidder: alice.address()
            },
            AuctionEvent::Claimed { bidder: bob.address() },
            AuctionEvent::AuctionEnded,
        ]
    );
}

/// Three bidders, one of them below the second price: escrow drains to zero.
#[test]
fn test_three_bidders_settle_exactly() {
    let mut h = Harness::new(true);
    let low = Bidder::generate(&mut OsRng);
    let high = Bidder::generate(&mut OsRng);
    let mid = Bidder::generate(&mut OsRng);
    let domain = h.auction.auction_id();

    h.place(&low.address(), 10, 10).unwrap();
    h.place(&high.address(), 30, 20).unwrap();
    h.place(&mid.address(), 20, 30).unwrap();
    assert_eq!(h.balance(&domain), 60);

    h.stop();
    assert_eq!(h.top_two(), (30, 20));
    assert_eq!(h.auction.highest_bidder(), Some(high.address()));

    // 10 - 20 wraps for the low bidder; the loser branch must win the select
    let record = h.auction.claim(&ctx(low.address(), 600)).unwrap();
    assert_eq!(h.world.fhe.decrypt_u64(&record.refund).unwrap(), 10);
    let record = h.auction.claim(&ctx(high.address(), 600)).unwrap();
    assert_eq!(h.world.fhe.decrypt_u64(&record.refund).unwrap(), 10);
    let record = h.auction.claim(&ctx(mid.address(), 600)).unwrap();
    assert_eq!(h.world.fhe.decrypt_u64(&record.refund).unwrap(), 20);

    h.auction.auction_end(&ctx(low.address(), 700)).unwrap();

    assert_eq!(h.sealed_balance(&low), FUNDS);
    assert_eq!(h.sealed_balance(&high), FUNDS - 30 + 10);
    assert_eq!(h.sealed_balance(&mid), FUNDS);
    assert_eq!(h.sealed_balance(&h.beneficiary), 20);
    assert_eq!(h.balance(&domain), 0);
    assert_eq!(h.world.registry.owner_of(ASSET_ID).unwrap(), high.address());
}

/// Claims remain open after the auction has ended, once per bidder.
#[test]
fn test_claim_after_end() {
    let mut h = Harness::new(true);
    let low = Bidder::generate(&mut OsRng);
    let high = Bidder::generate(&mut OsRng);
    let mid = Bidder::generate(&mut OsRng);
    let domain = h.auction.auction_id();

    h.place(&low.address(), 10, 10).unwrap();
    h.place(&high.address(), 30, 20).unwrap();
    h.place(&mid.address(), 20, 30).unwrap();
    h.stop();

    h.auction.auction_end(&ctx(h.beneficiary.address(), 600)).unwrap();
    assert_eq!(h.auction.state(600), AuctionState::Ended);
    assert_eq!(h.sealed_balance(&h.beneficiary), 20);
    assert_eq!(h.balance(&domain), 40);

    for bidder in [&low, &high, &mid] {
        h.auction.claim(&ctx(bidder.address(), 700)).unwrap();
    }
    assert_eq!(h.auction.state(700), AuctionState::Ended);
    assert_eq!(h.sealed_balance(&low), FUNDS);
    assert_eq!(h.sealed_balance(&high), FUNDS - 20);
    assert_eq!(h.sealed_balance(&mid), FUNDS);
    assert_eq!(h.balance(&domain), 0);

    let result = h.auction.claim(&ctx(mid.address(), 800));
    assert!(matches!(result, Err(AuctionError::AlreadyClaimed)));
    assert_eq!(h.sealed_balance(&mid), FUNDS);
    assert_eq!(h.balance(&domain), 0);
}

/// Final top-two and winner do not depend on bid order.
#[test]
fn test_permutation_invariance() {
    let amounts = [30u64, 10, 50, 20];
    assert_eq!(permutations(&amounts).len(), 24);

    for order in permutations(&amounts) {
        let mut h = Harness::new(true);
        for (i, amount) in order.iter().enumerate() {
            // Bidder identity follows the amount, not the position
            h.place(&addr(*amount as u8), *amount, i as u64 + 1).unwrap();
        }
        h.stop();

        assert_eq!(h.top_two(), (50, 30), "order {:?}", order);
        assert_eq!(h.auction.highest_bidder(), Some(addr(50)), "order {:?}", order);
    }
}

#[test]
fn test_single_bid_per_identity() {
    let mut h = Harness::new(true);
    h.place(&addr(1), 10, 1).unwrap();

    let result = h.place(&addr(1), 40, 2);
    assert_eq!(result, Err(AuctionError::DuplicateBid));
    assert_eq!(h.auction.bid_count(), 1);
    assert_eq!(h.top_two(), (10, 0));
}

#[test]
fn test_double_claim_pays_once() {
    let mut h = Harness::new(true);
    h.place(&addr(1), 10, 1).unwrap();
    h.place(&addr(2), 20, 2).unwrap();
    h.stop();

    h.auction.claim(&ctx(addr(1), 600)).unwrap();
    let result = h.auction.claim(&ctx(addr(1), 601));

    assert_eq!(result, Err(AuctionError::AlreadyClaimed));
    assert_eq!(h.balance(&addr(1)), FUNDS);
}

#[test]
fn test_no_bids_after_close() {
    // After the deadline
    let mut h = Harness::new(false);
    let result = h.place(&addr(1), 10, DURATION);
    assert!(matches!(
        result,
        Err(AuctionError::StateViolation {
            expected: AuctionState::Bidding,
            got: AuctionState::Stopped
        })
    ));
    assert_eq!(h.auction.bid_count(), 0);
    assert!(h.auction.module_state().bid_of(&addr(1)).is_none());

    // After an early stop
    let mut h = Harness::new(true);
    h.stop();
    assert!(h.place(&addr(1), 10, 501).is_err());
    assert_eq!(h.auction.bid_count(), 0);
}

#[test]
fn test_am_i_highest_bidder() {
    let mut h = Harness::new(true);
    let alice = Bidder::generate(&mut OsRng);
    let bob = Bidder::generate(&mut OsRng);
    let domain = h.auction.auction_id();

    h.place(&alice.address(), 10, 1).unwrap();
    let read = |h: &Harness, bidder: &Bidder| {
        let sealed = h
            .auction
            .am_i_highest_bidder(&bidder.address(), &bidder.authorize(&domain))
            .unwrap();
        bidder.open_bool(&sealed).unwrap()
    };
    assert!(read(&h, &alice));

    h.place(&bob.address(), 20, 2).unwrap();
    assert!(!read(&h, &alice));
    assert!(read(&h, &bob));

    // Alice asking about Bob's standing with her own key
    let result = h.auction.am_i_highest_bidder(&bob.address(), &alice.authorize(&domain));
    assert_eq!(result, Err(AuctionError::Unauthorized));
}

#[test]
fn test_constant_work_per_bid() {
    let mut h = Harness::new(true);
    h.place(&addr(1), 50, 1).unwrap();

    let measure = |h: &mut Harness, bidder: Address, amount: u64| {
        h.world.token.mint(&bidder, FUNDS).unwrap();
        let amount = h.world.fhe.encrypt_u64(amount);
        h.world.token.approve(&bidder, &h.auction.auction_id(), amount);

        let before = h.world.fhe.ops_executed();
        h.auction.bid(&ctx(bidder, 2), amount).unwrap();
        h.world.fhe.ops_executed() - before
    };

    let new_highest = measure(&mut h, addr(2), 90);
    let new_second = measure(&mut h, addr(3), 70);
    let below_both = measure(&mut h, addr(4), 5);

    assert_eq!(new_highest, new_second);
    assert_eq!(new_second, below_both);
    assert_eq!(h.top_two(), (90, 70));
}

#[test]
fn test_failed_payouts_are_retryable() {
    let mut h = Harness::new(true);
    let winner = addr(2);
    h.place(&addr(1), 10, 1).unwrap();
    h.place(&winner, 20, 2).unwrap();
    h.stop();

    // Refund
    h.world.token.fail_payouts(true);
    assert_eq!(h.auction.claim(&ctx(addr(1), 600)), Err(AuctionError::TransferFailed));
    assert!(!h.auction.module_state().bid_of(&addr(1)).unwrap().claimed);
    h.world.token.fail_payouts(false);
    h.auction.claim(&ctx(addr(1), 601)).unwrap();
    assert_eq!(h.balance(&addr(1)), FUNDS);

    // Asset transfer refused by the receiver
    h.world.registry.reject_receiver(&winner, true);
    let result = h.auction.auction_end(&ctx(addr(1), 602));
    assert_eq!(result, Err(AuctionError::NotOwnerOrNotApproved));
    assert_eq!(h.auction.state(602), AuctionState::Stopped);
    assert!(!h.auction.record().object_claimed);

    // Proceeds payout fails after the asset moved
    h.world.registry.reject_receiver(&winner, false);
    h.world.token.fail_payouts(true);
    let result = h.auction.auction_end(&ctx(addr(1), 603));
    assert_eq!(result, Err(AuctionError::TransferFailed));
    assert!(h.auction.record().object_claimed);
    assert_eq!(h.auction.state(603), AuctionState::Stopped);

    h.world.token.fail_payouts(false);
    h.auction.auction_end(&ctx(addr(1), 604)).unwrap();
    assert_eq!(h.auction.state(604), AuctionState::Ended);
    assert_eq!(h.world.registry.owner_of(ASSET_ID).unwrap(), winner);
    assert_eq!(h.balance(&h.beneficiary.address()), 10);
}

#[test]
fn test_authorization_bound_to_instance() {
    let world = MockWorld::new();
    let beneficiary = Bidder::generate(&mut OsRng);
    let mut first = create_auction(&world, &beneficiary, true, 0);
    let second = create_auction(&world, &beneficiary, true, 1);
    assert_ne!(first.auction_id(), second.auction_id());

    let alice = Bidder::generate(&mut OsRng);
    world.token.mint(&alice.address(), FUNDS).unwrap();
    let amount = world.fhe.encrypt_u64(10);
    world.token.approve(&alice.address(), &first.auction_id(), amount);
    first.bid(&ctx(alice.address(), 5), amount).unwrap();

    let for_second = alice.authorize(&second.auction_id());
    assert_eq!(
        first.get_bid(&alice.address(), &for_second),
        Err(AuctionError::Unauthorized)
    );

    let for_first = alice.authorize(&first.auction_id());
    assert!(first.get_bid(&alice.address(), &for_first).is_ok());
}

#[test]
fn test_concurrent_bids_match_sequential() {
    let amounts: Vec<u64> = vec![42, 7, 99, 63, 18, 75, 31, 88];

    // Sequential
    let mut sequential = Harness::new(true);
    for (i, amount) in amounts.iter().enumerate() {
        sequential.place(&addr(i as u8 + 1), *amount, 1).unwrap();
    }
    sequential.stop();

    // Concurrent through the shared handle
    let world = MockWorld::new();
    let beneficiary = Bidder::generate(&mut OsRng);
    let auction = create_auction(&world, &beneficiary, true, 0);
    let auction_id = auction.auction_id();
    let shared = SharedAuction::new(auction);

    let handles: Vec<_> = amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let bidder = addr(i as u8 + 1);
            world.token.mint(&bidder, FUNDS).unwrap();
            let amount = world.fhe.encrypt_u64(*amount);
            world.token.approve(&bidder, &auction_id, amount);

            let shared = shared.clone();
            thread::spawn(move || shared.submit(&ctx(bidder, 1), AuctionCall::Bid { amount }))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    shared
        .submit(&ctx(beneficiary.address(), 500), AuctionCall::Stop)
        .unwrap();

    let (top_two, winner) = shared.with(|auction| {
        let record = auction.record();
        (
            (
                world.fhe.decrypt_u64(&record.highest_bid).unwrap(),
                world.fhe.decrypt_u64(&record.second_highest_bid).unwrap(),
            ),
            auction.highest_bidder(),
        )
    });

    assert_eq!(top_two, sequential.top_two());
    assert_eq!(top_two, (99, 88));
    assert_eq!(winner, sequential.auction.highest_bidder());
    let escrow = world.token.balance_of(&auction_id);
    assert_eq!(
        world.fhe.decrypt_u64(&escrow).unwrap(),
        amounts.iter().sum::<u64>()
    );
}

#[test]
fn test_cancel_before_bids() {
    let mut h = Harness::new(true);
    let call = ctx(h.beneficiary.address(), 10);
    h.auction.cancel(&call).unwrap();

    assert_eq!(h.auction.state(11), AuctionState::Canceled);
    assert!(h.place(&addr(1), 10, 12).is_err());
    assert_eq!(
        h.auction.auction_end(&ctx(addr(1), 13)),
        Ok(EndOutcome::Canceled)
    );
    assert_eq!(h.world.registry.owner_of(ASSET_ID).unwrap(), h.beneficiary.address());
}

#[test]
fn test_no_bids_returns_nothing() {
    let mut h = Harness::new(false);
    let outcome = h.auction.auction_end(&ctx(addr(9), DURATION)).unwrap();

    assert_eq!(outcome, EndOutcome::NoWinner);
    assert_eq!(h.auction.state(DURATION), AuctionState::Ended);
    assert_eq!(h.world.registry.owner_of(ASSET_ID).unwrap(), h.beneficiary.address());
    assert_eq!(
        h.auction.events(),
        &[AuctionEvent::AuctionStopped, AuctionEvent::AuctionEnded]
    );
}
