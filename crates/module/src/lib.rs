//! Confidential sealed-bid second-price auction.
//!
//! Bids are encrypted integers. The auction keeps the running highest and
//! second-highest bid under encryption, never decrypting an amount, and
//! settles at the second price:
//!
//! - Encrypted bid submission with escrow in a confidential payment ledger
//! - Oblivious top-two tracking with a fixed operation sequence per bid
//! - Lifecycle `Created -> Bidding -> Stopped -> Ended` (or `Canceled`)
//! - Encrypted refunds and asset transfer to the winner
//! - Confidential reads sealed to an authorized viewer's key
//!
//! # Architecture
//!
//! - `auction`: the instance facade, rollback and events
//! - `bid_ledger`: bid storage and the top-two tracker
//! - `lifecycle`: admissible operations per state
//! - `settlement`: claims and the final transfer
//! - `access`: authorization of confidential reads
//! - `collaborators`: payment ledger and asset registry interfaces
//! - `call` / `handlers` / `queries`: message surface
//! - `host`: serialized shared handle
//!
//! # Example
//!
//! ```ignore
//! use vickrey_module::{AuctionCall, CallContext, SharedAuction, VickreyAuction};
//!
//! let auction = VickreyAuction::new(params, now, collaborators)?;
//! let shared = SharedAuction::new(auction);
//!
//! let ctx = CallContext { sender: bidder, timestamp: now };
//! shared.submit(&ctx, AuctionCall::Bid { amount })?;
//! ```

pub mod access;
pub mod auction;
pub mod bid_ledger;
pub mod call;
pub mod collaborators;
pub mod error;
pub mod handlers;
pub mod host;
pub mod lifecycle;
pub mod params;
pub mod queries;
pub mod settlement;
pub mod state;

#[cfg(test)]
mod test_support;

pub use access::AccessGate;
pub use auction::VickreyAuction;
pub use call::AuctionCall;
pub use collaborators::{AssetRegistry, Collaborators, LedgerError, PaymentLedger, RegistryError};
pub use error::AuctionError;
pub use handlers::{handle_call, CallContext, CallOutcome, HandlerResult};
pub use host::SharedAuction;
pub use params::{AuctionParams, AuctionParamsError};
pub use queries::{handle_query, AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use settlement::{ClaimRecord, EndOutcome};
pub use state::ModuleState;
