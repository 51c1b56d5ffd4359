//! One confidential auction instance.
//!
//! [`VickreyAuction`] owns the instance state and the collaborators it settles
//! against. Every operation either commits completely or leaves the instance
//! untouched; lifecycle transitions and accepted operations are recorded as
//! [`AuctionEvent`]s, none of which carry amounts.

use tracing::{debug, info};

use vickrey_types::{Address, AuctionEvent, AuctionState, Euint64, SealedValue, ViewerAuthorization};

use crate::bid_ledger;
use crate::collaborators::Collaborators;
use crate::handlers::{CallContext, HandlerResult};
use crate::lifecycle;
use crate::params::AuctionParams;
use crate::settlement::{self, ClaimRecord, EndOutcome};
use crate::state::{AuctionRecord, ModuleState};

pub struct VickreyAuction {
    state: ModuleState,
    env: Collaborators,
    events: Vec<AuctionEvent>,
}

impl VickreyAuction {
    /// Create an auction at `created_at` and open it for bids.
    pub fn new(params: AuctionParams, created_at: u64, env: Collaborators) -> HandlerResult<Self> {
        params.validate()?;
        let deadline = params.deadline(created_at)?;

        let mut auction = AuctionRecord::new(&params, created_at, deadline, env.fhe.as_ref());
        lifecycle::open_bidding(&mut auction);

        info!(
            auction = %hex::encode(auction.auction_id),
            beneficiary = %hex::encode(auction.beneficiary),
            asset_id = auction.asset.asset_id,
            deadline,
            stoppable = auction.stoppable,
            "Auction created"
        );

        Ok(Self {
            state: ModuleState::new(auction),
            env,
            events: Vec::new(),
        })
    }

    // === Public reads ===

    pub fn auction_id(&self) -> Address {
        self.state.auction.auction_id
    }

    /// Lifecycle state as seen at `now`.
    pub fn state(&self, now: u64) -> AuctionState {
        lifecycle::effective_state(&self.state.auction, now)
    }

    /// Winner identity, known once bidding stopped.
    pub fn highest_bidder(&self) -> Option<Address> {
        self.state.auction.highest_bidder
    }

    pub fn beneficiary(&self) -> Address {
        self.state.auction.beneficiary
    }

    pub fn bidding_deadline(&self) -> u64 {
        self.state.auction.bidding_deadline
    }

    pub fn bid_count(&self) -> usize {
        self.state.bid_count()
    }

    pub fn record(&self) -> &AuctionRecord {
        &self.state.auction
    }

    pub fn module_state(&self) -> &ModuleState {
        &self.state
    }

    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.events)
    }

    // === Calls ===

    pub fn bid(&mut self, ctx: &CallContext, amount: Euint64) -> HandlerResult<()> {
        self.transact(|state, env| bid_ledger::submit_bid(state, env, ctx, amount))?;
        self.emit(AuctionEvent::BidPlaced { bidder: ctx.sender });
        Ok(())
    }

    pub fn stop(&mut self, ctx: &CallContext) -> HandlerResult<()> {
        let before = self.state.auction.state;
        self.transact(|state, env| lifecycle::stop(state, env.fhe.as_ref(), ctx))?;
        self.record_transition(before);
        Ok(())
    }

    pub fn cancel(&mut self, ctx: &CallContext) -> HandlerResult<()> {
        let before = self.state.auction.state;
        self.transact(|state, _| lifecycle::cancel(state, ctx))?;
        self.record_transition(before);
        Ok(())
    }

    pub fn claim(&mut self, ctx: &CallContext) -> HandlerResult<ClaimRecord> {
        let before = self.state.auction.state;
        let record = self.transact(|state, env| settlement::claim(state, env, ctx))?;
        self.record_transition(before);
        self.emit(AuctionEvent::Claimed { bidder: ctx.sender });
        Ok(record)
    }

    /// Settlement steps commit one at a time, so a failed call may still have
    /// advanced the auction.
    pub fn auction_end(&mut self, ctx: &CallContext) -> HandlerResult<EndOutcome> {
        let before = self.state.auction.state;
        let result = settlement::auction_end(&mut self.state, &self.env, ctx);
        self.record_transition(before);
        result
    }

    // === Confidential reads ===

    pub fn get_bid(
        &self,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<SealedValue> {
        bid_ledger::get_bid(&self.state, self.env.fhe.as_ref(), requester, authorization)
    }

    pub fn am_i_highest_bidder(
        &self,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<SealedValue> {
        bid_ledger::am_i_highest_bidder(
            &self.state,
            self.env.fhe.as_ref(),
            requester,
            authorization,
        )
    }

    pub fn object_claimed(
        &self,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<SealedValue> {
        settlement::object_claimed(&self.state, self.env.fhe.as_ref(), requester, authorization)
    }

    /// Run `f` against the state, restoring the previous state if it fails.
    fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut ModuleState, &Collaborators) -> HandlerResult<T>,
    ) -> HandlerResult<T> {
        let snapshot = self.state.clone();
        f(&mut self.state, &self.env).map_err(|e| {
            self.state = snapshot;
            debug!(error = %e, "Call rejected");
            e
        })
    }

    fn record_transition(&mut self, before: AuctionState) {
        let after = self.state.auction.state;
        if before == after {
            return;
        }

        let closed = matches!(after, AuctionState::Stopped | AuctionState::Ended);
        if before == AuctionState::Bidding && closed {
            self.emit(AuctionEvent::AuctionStopped);
        }
        match after {
            AuctionState::Ended => self.emit(AuctionEvent::AuctionEnded),
            AuctionState::Canceled => self.emit(AuctionEvent::AuctionCanceled),
            _ => {}
        }
    }

    fn emit(&mut self, event: AuctionEvent) {
        debug!(auction = %hex::encode(self.state.auction.auction_id), ?event, "Event");
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuctionError;
    use crate::params::AuctionParamsError;
    use crate::test_support::{collaborators, ctx, params, BENEFICIARY, DURATION, OWNER};
    use vickrey_crypto::FheBackend;

    const LOW: Address = [0x10; 32];
    const HIGH: Address = [0x20; 32];

    #[test]
    fn test_rejects_invalid_params() {
        let (env, _, _, _) = collaborators();
        let mut p = params(true);
        p.bidding_duration = 0;

        let result = VickreyAuction::new(p, 0, env);
        assert!(matches!(
            result,
            Err(AuctionError::InvalidParams(AuctionParamsError::ZeroDuration))
        ));
    }

    #[test]
    fn test_events_carry_no_amounts() {
        let (env, fhe, _, _) = collaborators();
        let mut auction = VickreyAuction::new(params(true), 0, env).unwrap();

        auction.bid(&ctx(LOW, 1), fhe.encrypt_u64(10)).unwrap();
        auction.bid(&ctx(HIGH, 2), fhe.encrypt_u64(20)).unwrap();
        auction.stop(&ctx(BENEFICIARY, 3)).unwrap();
        auction.claim(&ctx(LOW, 4)).unwrap();
        auction.auction_end(&ctx(OWNER, 5)).unwrap();

        assert_eq!(
            auction.drain_events(),
            vec![
                AuctionEvent::BidPlaced { bidder: LOW },
                AuctionEvent::BidPlaced { bidder: HIGH },
                AuctionEvent::AuctionStopped,
                AuctionEvent::Claimed { bidder: LOW },
                AuctionEvent::AuctionEnded,
            ]
        );
        assert!(auction.events().is_empty());
    }

    #[test]
    fn test_rejected_call_changes_nothing() {
        let (env, fhe, ledger, _) = collaborators();
        let mut auction = VickreyAuction::new(params(true), 0, env).unwrap();
        auction.bid(&ctx(LOW, 1), fhe.encrypt_u64(10)).unwrap();
        auction.stop(&ctx(BENEFICIARY, 2)).unwrap();
        let events = auction.events().len();

        ledger.fail_payouts(true);
        assert_eq!(auction.claim(&ctx(LOW, 3)), Err(AuctionError::TransferFailed));
        assert!(!auction.module_state().bid_of(&LOW).unwrap().claimed);
        assert_eq!(auction.events().len(), events);
    }

    #[test]
    fn test_failed_claim_rolls_back_lapsed_stop() {
        let (env, fhe, ledger, _) = collaborators();
        let mut auction = VickreyAuction::new(params(false), 0, env).unwrap();
        auction.bid(&ctx(LOW, 1), fhe.encrypt_u64(10)).unwrap();

        ledger.fail_payouts(true);
        assert!(auction.claim(&ctx(LOW, DURATION)).is_err());
        assert_eq!(auction.record().state, AuctionState::Bidding);
        assert_eq!(auction.highest_bidder(), None);

        // Still observed as stopped
        assert_eq!(auction.state(DURATION), AuctionState::Stopped);

        ledger.fail_payouts(false);
        auction.claim(&ctx(LOW, DURATION + 1)).unwrap();
        assert_eq!(auction.highest_bidder(), Some(LOW));
        assert!(auction.events().contains(&AuctionEvent::AuctionStopped));
    }

    #[test]
    fn test_cancel_emits_event() {
        let (env, _, _, _) = collaborators();
        let mut auction = VickreyAuction::new(params(true), 0, env).unwrap();

        auction.cancel(&ctx(BENEFICIARY, 1)).unwrap();
        assert_eq!(auction.state(2), AuctionState::Canceled);
        assert_eq!(auction.events(), &[AuctionEvent::AuctionCanceled]);
    }

    #[test]
    fn test_cancel_after_bid_rejected() {
        let (env, fhe, _, _) = collaborators();
        let mut auction = VickreyAuction::new(params(true), 0, env).unwrap();
        auction.bid(&ctx(LOW, 1), fhe.encrypt_u64(10)).unwrap();

        assert_eq!(auction.cancel(&ctx(BENEFICIARY, 2)), Err(AuctionError::BidsAlreadyPlaced));
        assert_eq!(auction.state(2), AuctionState::Bidding);
    }
}
