//! Query handlers for the auction module.
//!
//! Public fields are answered directly. Confidential reads carry a viewer
//! authorization and are answered with a value sealed to that viewer.

use serde::{Deserialize, Serialize};

use vickrey_types::{Address, AssetRef, AuctionState, SealedValue, ViewerAuthorization};

use crate::auction::VickreyAuction;
use crate::handlers::HandlerResult;

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Public summary of the auction.
    GetAuction,

    /// Lifecycle state.
    GetState,

    /// Winner identity, once bidding stopped.
    GetHighestBidder,

    /// Number of accepted bids.
    GetBidCount,

    /// The requester's own bid.
    GetBid {
        requester: Address,
        authorization: ViewerAuthorization,
    },

    /// Whether the requester currently leads.
    AmIHighestBidder {
        requester: Address,
        authorization: ViewerAuthorization,
    },

    /// Whether the requester won and received the asset.
    ObjectClaimed {
        requester: Address,
        authorization: ViewerAuthorization,
    },
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Auction(AuctionSummary),

    State(AuctionState),

    HighestBidder(Option<Address>),

    BidCount(usize),

    /// A confidential value sealed to the requester's key.
    Sealed(SealedValue),
}

/// Handle a query at time `now`.
pub fn handle_query(
    auction: &VickreyAuction,
    now: u64,
    query: AuctionQuery,
) -> HandlerResult<AuctionQueryResponse> {
    let response = match query {
        AuctionQuery::GetAuction => {
            AuctionQueryResponse::Auction(AuctionSummary::from_auction(auction, now))
        }

        AuctionQuery::GetState => AuctionQueryResponse::State(auction.state(now)),

        AuctionQuery::GetHighestBidder => {
            AuctionQueryResponse::HighestBidder(auction.highest_bidder())
        }

        AuctionQuery::GetBidCount => AuctionQueryResponse::BidCount(auction.bid_count()),

        AuctionQuery::GetBid {
            requester,
            authorization,
        } => AuctionQueryResponse::Sealed(auction.get_bid(&requester, &authorization)?),

        AuctionQuery::AmIHighestBidder {
            requester,
            authorization,
        } => AuctionQueryResponse::Sealed(auction.am_i_highest_bidder(&requester, &authorization)?),

        AuctionQuery::ObjectClaimed {
            requester,
            authorization,
        } => AuctionQueryResponse::Sealed(auction.object_claimed(&requester, &authorization)?),
    };
    Ok(response)
}

/// Public view of an auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction_id: Address,
    pub beneficiary: Address,
    pub asset: AssetRef,
    pub payment_token: Address,
    pub bidding_deadline: u64,
    pub stoppable: bool,
    pub state: AuctionState,
    pub num_bids: usize,
    pub highest_bidder: Option<Address>,
}

impl AuctionSummary {
    /// Summarize an auction as seen at `now`.
    pub fn from_auction(auction: &VickreyAuction, now: u64) -> Self {
        let record = auction.record();
        Self {
            auction_id: record.auction_id,
            beneficiary: record.beneficiary,
            asset: record.asset.clone(),
            payment_token: record.payment_token,
            bidding_deadline: record.bidding_deadline,
            stoppable: record.stoppable,
            state: auction.state(now),
            num_bids: auction.bid_count(),
            highest_bidder: record.highest_bidder,
        }
    }
}
