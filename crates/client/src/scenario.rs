//! Scripted auction runs against the mock collaborators.
//!
//! A scenario describes the auction, the funded bidders and when each bids.
//! Running it drives the full lifecycle (bid, stop, claim, end) through the
//! call surface, then reads every balance back through the confidential
//! balance query, so the report only contains values a participant could
//! legitimately learn about themselves.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{info, warn};

use vickrey_mock_ledger::MockWorld;
use vickrey_module::{
    AssetRegistry, AuctionCall, AuctionError, AuctionParams, CallContext, LedgerError,
    PaymentLedger, SharedAuction, VickreyAuction,
};
use vickrey_types::{Address, AssetRef, AuctionEvent, AuctionState};

use crate::bidder::{Bidder, BidderError};

const ASSET_ID: u64 = 1;

/// Errors that can abort a scenario run.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Scenario has no bidders")]
    NoBidders,

    #[error("Duplicate bidder name: {0}")]
    DuplicateName(String),

    #[error("stop_at is set but the auction is not stoppable")]
    StopNotAllowed,

    #[error("Auction rejected the operation: {0}")]
    Auction(#[from] AuctionError),

    #[error("Ledger rejected the operation: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Bidder(#[from] BidderError),
}

/// Input file format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    /// Seconds bidding stays open
    pub bidding_duration: u64,
    /// Whether the beneficiary may stop early
    #[serde(default)]
    pub stoppable: bool,
    /// Time the beneficiary stops bidding; the deadline when absent
    #[serde(default)]
    pub stop_at: Option<u64>,
    pub bidders: Vec<ScenarioBidder>,
}

impl Scenario {
    /// Reject scenarios that could not run to settlement.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.bidders.is_empty() {
            return Err(ScenarioError::NoBidders);
        }
        if self.stop_at.is_some() && !self.stoppable {
            return Err(ScenarioError::StopNotAllowed);
        }
        let mut seen = BTreeSet::new();
        for entry in &self.bidders {
            if !seen.insert(entry.name.as_str()) {
                return Err(ScenarioError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioBidder {
    pub name: String,
    /// Initial token balance
    pub balance: u64,
    /// Amount bid (encrypted before submission)
    pub bid: u64,
    /// Time of the bid
    pub at: u64,
}

/// What every participant can see once the run is over.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub auction_id: String,
    pub state: AuctionState,
    pub winner: Option<String>,
    pub asset_owner: String,
    pub beneficiary_balance: u64,
    /// Final balance per bidder, as opened by the bidder
    pub balances: BTreeMap<String, u64>,
    /// Bidders whose bid was refused, with the reason
    pub rejected: BTreeMap<String, String>,
    pub events: usize,
}

/// Run `scenario` from creation to settlement.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    scenario.validate()?;

    let world = MockWorld::new();
    let beneficiary = Bidder::generate(&mut OsRng);
    let owner = beneficiary.address();

    let mut names = BTreeMap::new();
    names.insert(owner, "beneficiary".to_string());

    world.registry.mint(ASSET_ID, &owner);
    let params = AuctionParams {
        asset: AssetRef {
            registry: world.registry.registry_id(),
            asset_id: ASSET_ID,
        },
        beneficiary: beneficiary.address(),
        payment_token: world.token.ledger_id(),
        owner,
        bidding_duration: scenario.bidding_duration,
        stoppable: scenario.stoppable,
    };
    let auction = VickreyAuction::new(params, 0, world.collaborators())?;
    let auction_id = auction.auction_id();
    let deadline = auction.bidding_deadline();
    world.registry.set_approval_for_all(&owner, &auction_id, true);

    info!(auction = %hex::encode(auction_id), bidders = scenario.bidders.len(), "Running scenario");
    let shared = SharedAuction::new(auction);

    let mut bidders = Vec::with_capacity(scenario.bidders.len());
    let mut rejected = BTreeMap::new();
    let mut last = 0;
    for entry in &scenario.bidders {
        let bidder = Bidder::generate(&mut OsRng);
        names.insert(bidder.address(), entry.name.clone());

        world.token.mint(&bidder.address(), entry.balance)?;
        let amount = Bidder::encrypt_bid(world.fhe.as_ref(), entry.bid);
        world.token.approve(&bidder.address(), &auction_id, amount);

        let ctx = CallContext {
            sender: bidder.address(),
            timestamp: entry.at,
        };
        if let Err(e) = shared.submit(&ctx, AuctionCall::Bid { amount }) {
            warn!(bidder = %entry.name, error = %e, "Bid refused");
            rejected.insert(entry.name.clone(), e.to_string());
        }

        last = last.max(entry.at);
        bidders.push((entry.name.clone(), bidder));
    }

    let stop_at = scenario.stop_at.unwrap_or(deadline).max(last);
    if stop_at < deadline {
        let ctx = CallContext {
            sender: beneficiary.address(),
            timestamp: stop_at,
        };
        shared.submit(&ctx, AuctionCall::Stop)?;
    }
    let settle_at = stop_at.max(deadline);

    for (name, bidder) in &bidders {
        if rejected.contains_key(name) {
            continue;
        }
        let ctx = CallContext {
            sender: bidder.address(),
            timestamp: settle_at,
        };
        shared.submit(&ctx, AuctionCall::Claim)?;
    }

    let ctx = CallContext {
        sender: owner,
        timestamp: settle_at,
    };
    shared.submit(&ctx, AuctionCall::AuctionEnd)?;

    let mut balances = BTreeMap::new();
    for (name, bidder) in &bidders {
        let sealed = world
            .token
            .balance_query(&bidder.address(), &bidder.authorize(&world.token.ledger_id()))?;
        balances.insert(name.clone(), bidder.open_u64(&sealed)?);
    }
    let sealed = world
        .token
        .balance_query(&beneficiary.address(), &beneficiary.authorize(&world.token.ledger_id()))?;
    let beneficiary_balance = beneficiary.open_u64(&sealed)?;

    let label = |address: &Address| {
        names
            .get(address)
            .cloned()
            .unwrap_or_else(|| hex::encode(address))
    };
    let asset_owner = world
        .registry
        .owner_of(ASSET_ID)
        .map_err(AuctionError::from)?;

    let events = shared.drain_events();
    let ended = events.contains(&AuctionEvent::AuctionEnded);
    let (state, winner) =
        shared.with(|auction| (auction.state(settle_at), auction.highest_bidder()));
    info!(ended, winner = ?winner.as_ref().map(&label), "Scenario finished");

    Ok(ScenarioReport {
        auction_id: hex::encode(auction_id),
        state,
        winner: winner.as_ref().map(&label),
        asset_owner: label(&asset_owner),
        beneficiary_balance,
        balances,
        rejected,
        events: events.len(),
    })
}
