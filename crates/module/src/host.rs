//! Shared handle serializing access to one auction instance.
//!
//! All calls on an instance run one at a time, each to completion. Clones of
//! a [`SharedAuction`] refer to the same instance and can be moved across
//! threads.

use parking_lot::Mutex;
use std::sync::Arc;

use vickrey_types::AuctionEvent;

use crate::auction::VickreyAuction;
use crate::call::AuctionCall;
use crate::handlers::{handle_call, CallContext, CallOutcome, HandlerResult};
use crate::queries::{handle_query, AuctionQuery, AuctionQueryResponse};

#[derive(Clone)]
pub struct SharedAuction {
    inner: Arc<Mutex<VickreyAuction>>,
}

impl SharedAuction {
    pub fn new(auction: VickreyAuction) -> Self {
        Self {
            inner: Arc::new(Mutex::new(auction)),
        }
    }

    /// Apply a call. Blocks until the instance is free.
    pub fn submit(&self, ctx: &CallContext, call: AuctionCall) -> HandlerResult<CallOutcome> {
        handle_call(&mut self.inner.lock(), ctx, call)
    }

    pub fn query(&self, now: u64, query: AuctionQuery) -> HandlerResult<AuctionQueryResponse> {
        handle_query(&self.inner.lock(), now, query)
    }

    /// Run `f` with exclusive access to the instance.
    pub fn with<T>(&self, f: impl FnOnce(&mut VickreyAuction) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn drain_events(&self) -> Vec<AuctionEvent> {
        self.inner.lock().drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collaborators, ctx, params};
    use std::thread;
    use vickrey_crypto::FheBackend;

    #[test]
    fn test_concurrent_bids_are_serialized() {
        let (env, fhe, _, _) = collaborators();
        let shared = SharedAuction::new(VickreyAuction::new(params(true), 0, env).unwrap());

        let handles: Vec<_> = (1u8..=8)
            .map(|i| {
                let shared = shared.clone();
                let amount = fhe.encrypt_u64(u64::from(i) * 10);
                thread::spawn(move || shared.submit(&ctx([i; 32], 1), AuctionCall::Bid { amount }))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        shared.with(|auction| {
            let record = auction.record();
            assert_eq!(auction.bid_count(), 8);
            assert_eq!(fhe.decrypt_u64(&record.highest_bid).unwrap(), 80);
            assert_eq!(fhe.decrypt_u64(&record.second_highest_bid).unwrap(), 70);
        });
        assert_eq!(shared.drain_events().len(), 8);
    }
}
