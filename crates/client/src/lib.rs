//! Client SDK for bidding in confidential second-price auctions.
//!
//! This crate provides:
//! - Viewing keys and authorizations for confidential reads
//! - Client-side encryption of bid amounts
//! - Opening values sealed to the bidder
//! - Scripted runs of a full auction against the mock collaborators

pub mod bidder;
pub mod scenario;

pub use bidder::{Bidder, BidderError};
pub use scenario::{run_scenario, Scenario, ScenarioBidder, ScenarioError, ScenarioReport};
