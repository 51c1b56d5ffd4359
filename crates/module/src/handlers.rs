//! Call dispatch for the auction module.

use tracing::debug;

use vickrey_types::Address;

use crate::auction::VickreyAuction;
use crate::call::AuctionCall;
use crate::error::AuctionError;
use crate::settlement::{ClaimRecord, EndOutcome};

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Sender of the call
    pub sender: Address,
    /// Current timestamp
    pub timestamp: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// What a successful call produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    BidPlaced,
    Stopped,
    Canceled,
    Claimed(ClaimRecord),
    Ended(EndOutcome),
}

/// Dispatch a call to the auction instance.
pub fn handle_call(
    auction: &mut VickreyAuction,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallOutcome> {
    debug!(sender = %hex::encode(ctx.sender), timestamp = ctx.timestamp, ?call, "Handling call");

    match call {
        AuctionCall::Bid { amount } => auction.bid(ctx, amount).map(|_| CallOutcome::BidPlaced),
        AuctionCall::Stop => auction.stop(ctx).map(|_| CallOutcome::Stopped),
        AuctionCall::Cancel => auction.cancel(ctx).map(|_| CallOutcome::Canceled),
        AuctionCall::Claim => auction.claim(ctx).map(CallOutcome::Claimed),
        AuctionCall::AuctionEnd => auction.auction_end(ctx).map(CallOutcome::Ended),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collaborators, ctx, params, BENEFICIARY, OWNER};
    use vickrey_crypto::FheBackend;
    use vickrey_types::AuctionState;

    #[test]
    fn test_dispatch_full_round() {
        let (env, fhe, _, _) = collaborators();
        let mut auction = VickreyAuction::new(params(true), 0, env).unwrap();

        let bidder = [0x42; 32];
        let call = AuctionCall::Bid {
            amount: fhe.encrypt_u64(30),
        };
        assert_eq!(handle_call(&mut auction, &ctx(bidder, 1), call), Ok(CallOutcome::BidPlaced));
        assert_eq!(
            handle_call(&mut auction, &ctx(BENEFICIARY, 2), AuctionCall::Stop),
            Ok(CallOutcome::Stopped)
        );

        let outcome = handle_call(&mut auction, &ctx(bidder, 3), AuctionCall::Claim).unwrap();
        assert!(matches!(outcome, CallOutcome::Claimed(_)));

        let outcome = handle_call(&mut auction, &ctx(OWNER, 4), AuctionCall::AuctionEnd).unwrap();
        assert_eq!(outcome, CallOutcome::Ended(EndOutcome::Settled { winner: bidder }));
        assert_eq!(auction.state(5), AuctionState::Ended);
    }

    #[test]
    fn test_call_borsh_roundtrip() {
        let call = AuctionCall::Claim;
        let encoded = borsh::to_vec(&call).unwrap();
        let decoded: AuctionCall = borsh::from_slice(&encoded).unwrap();
        assert_eq!(decoded, call);
    }
}
