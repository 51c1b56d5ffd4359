//! State structures owned by one auction instance.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use vickrey_crypto::FheBackend;
use vickrey_types::{compute_auction_id, Address, AssetRef, AuctionState, Euint64};

use crate::params::AuctionParams;

/// Encrypted leader slot while no bid has ever led.
pub const NO_LEADER: u64 = u64::MAX;

/// Slot compared against the leader for requesters who never bid.
pub const NON_BIDDER_SLOT: u64 = u64::MAX - 1;

/// The auction record.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionRecord {
    /// Instance identity; also the escrow account and authorization domain
    pub auction_id: Address,
    pub beneficiary: Address,
    pub owner: Address,
    pub asset: AssetRef,
    pub payment_token: Address,
    pub created_at: u64,
    pub bidding_deadline: u64,
    pub stoppable: bool,
    /// Stored lifecycle state. See `lifecycle::effective_state` for the
    /// deadline-aware view.
    pub state: AuctionState,

    pub highest_bid: Euint64,
    pub second_highest_bid: Euint64,
    /// Encrypted slot of the current leader, `NO_LEADER` before anyone leads
    pub leader_slot: Euint64,

    /// Revealed once when bidding stops
    pub highest_bidder: Option<Address>,
    /// The winner's asset transfer went through
    pub object_claimed: bool,
    /// The second price was paid to the beneficiary
    pub proceeds_paid: bool,
}

impl AuctionRecord {
    /// Build a freshly created auction with its running top-two at zero.
    pub fn new(
        params: &AuctionParams,
        created_at: u64,
        bidding_deadline: u64,
        fhe: &dyn FheBackend,
    ) -> Self {
        let auction_id = compute_auction_id(
            &params.asset,
            &params.beneficiary,
            &params.payment_token,
            &params.owner,
            bidding_deadline,
            params.stoppable,
            created_at,
        );

        Self {
            auction_id,
            beneficiary: params.beneficiary,
            owner: params.owner,
            asset: params.asset.clone(),
            payment_token: params.payment_token,
            created_at,
            bidding_deadline,
            stoppable: params.stoppable,
            state: AuctionState::Created,
            highest_bid: fhe.trivial_u64(0),
            second_highest_bid: fhe.trivial_u64(0),
            leader_slot: fhe.trivial_u64(NO_LEADER),
            highest_bidder: None,
            object_claimed: false,
            proceeds_paid: false,
        }
    }
}

/// One participant's bid.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BidRecord {
    pub bidder: Address,
    /// Public insertion index
    pub slot: u64,
    /// The ciphertext as submitted
    pub amount: Euint64,
    pub placed_at: u64,
    pub claimed: bool,
}

/// Durable state of one auction instance.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct ModuleState {
    pub auction: AuctionRecord,

    /// Bids by bidder
    pub bids: HashMap<Address, BidRecord>,

    /// Bidders in slot order
    pub bidders: Vec<Address>,
}

impl ModuleState {
    /// Create the state of a new instance.
    pub fn new(auction: AuctionRecord) -> Self {
        Self {
            auction,
            bids: HashMap::new(),
            bidders: Vec::new(),
        }
    }

    pub fn bid_of(&self, bidder: &Address) -> Option<&BidRecord> {
        self.bids.get(bidder)
    }

    pub fn bid_of_mut(&mut self, bidder: &Address) -> Option<&mut BidRecord> {
        self.bids.get_mut(bidder)
    }

    pub fn bid_count(&self) -> usize {
        self.bidders.len()
    }

    /// Slot the next bid will occupy.
    pub fn next_slot(&self) -> u64 {
        self.bidders.len() as u64
    }

    /// Bidder occupying `slot`, if any.
    pub fn bidder_at(&self, slot: u64) -> Option<Address> {
        bidder_at(&self.bidders, slot)
    }

    /// Record a new bid in the next slot.
    pub fn insert_bid(&mut self, bid: BidRecord) {
        debug_assert_eq!(bid.slot, self.next_slot());
        self.bidders.push(bid.bidder);
        self.bids.insert(bid.bidder, bid);
    }
}

pub(crate) fn bidder_at(bidders: &[Address], slot: u64) -> Option<Address> {
    usize::try_from(slot)
        .ok()
        .and_then(|index| bidders.get(index))
        .copied()
}
