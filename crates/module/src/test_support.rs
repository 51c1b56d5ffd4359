//! In-crate doubles for the payment ledger and asset registry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vickrey_crypto::MockFhe;
use vickrey_types::{Address, AssetRef, Euint64, SealedValue, ViewerAuthorization};

use crate::collaborators::{AssetRegistry, Collaborators, LedgerError, PaymentLedger, RegistryError};
use crate::handlers::CallContext;
use crate::lifecycle::open_bidding;
use crate::params::AuctionParams;
use crate::state::{AuctionRecord, ModuleState};

pub const BENEFICIARY: Address = [0xB0; 32];
pub const OWNER: Address = [0xA0; 32];
pub const REGISTRY: Address = [0xC0; 32];
pub const TOKEN: Address = [0xD0; 32];
pub const ASSET_ID: u64 = 7;
pub const DURATION: u64 = 1000;

/// Ledger that accepts every pull and records every payout.
#[derive(Default)]
pub struct RecordingLedger {
    pub pulls: Mutex<Vec<(Address, Euint64)>>,
    pub payouts: Mutex<Vec<(Address, Euint64)>>,
    reject_pulls: AtomicBool,
    fail_payouts: AtomicBool,
}

impl RecordingLedger {
    pub fn reject_pulls(&self, reject: bool) {
        self.reject_pulls.store(reject, Ordering::SeqCst);
    }

    pub fn fail_payouts(&self, fail: bool) {
        self.fail_payouts.store(fail, Ordering::SeqCst);
    }
}

impl PaymentLedger for RecordingLedger {
    fn authorize_and_pull(
        &self,
        _spender: &Address,
        payer: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError> {
        if self.reject_pulls.load(Ordering::SeqCst) {
            return Err(LedgerError::InsufficientAllowance);
        }
        self.pulls.lock().push((*payer, *amount));
        Ok(())
    }

    fn pay_out(
        &self,
        _spender: &Address,
        payee: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError> {
        if self.fail_payouts.load(Ordering::SeqCst) {
            return Err(LedgerError::TransferFailed);
        }
        self.payouts.lock().push((*payee, *amount));
        Ok(())
    }

    fn balance_query(
        &self,
        _owner: &Address,
        _authorization: &ViewerAuthorization,
    ) -> Result<SealedValue, LedgerError> {
        Err(LedgerError::Unauthorized)
    }
}

/// Registry tracking owners of a handful of assets.
#[derive(Default)]
pub struct StaticRegistry {
    owners: Mutex<HashMap<u64, Address>>,
    fail_transfers: AtomicBool,
}

impl StaticRegistry {
    pub fn with_asset(asset_id: u64, owner: Address) -> Self {
        let registry = Self::default();
        registry.owners.lock().insert(asset_id, owner);
        registry
    }

    pub fn fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }
}

impl AssetRegistry for StaticRegistry {
    fn transfer(
        &self,
        _operator: &Address,
        from: &Address,
        to: &Address,
        asset_id: u64,
    ) -> Result<(), RegistryError> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(RegistryError::NotOwnerOrNotApproved);
        }
        let mut owners = self.owners.lock();
        let owner = owners
            .get_mut(&asset_id)
            .ok_or(RegistryError::UnknownAsset(asset_id))?;
        if owner != from {
            return Err(RegistryError::NotOwnerOrNotApproved);
        }
        *owner = *to;
        Ok(())
    }

    fn owner_of(&self, asset_id: u64) -> Result<Address, RegistryError> {
        self.owners
            .lock()
            .get(&asset_id)
            .copied()
            .ok_or(RegistryError::UnknownAsset(asset_id))
    }
}

pub struct Fixture {
    pub state: ModuleState,
    pub env: Collaborators,
    pub fhe: Arc<MockFhe>,
    pub ledger: Arc<RecordingLedger>,
    pub registry: Arc<StaticRegistry>,
}

pub fn params(stoppable: bool) -> AuctionParams {
    AuctionParams {
        asset: AssetRef {
            registry: REGISTRY,
            asset_id: ASSET_ID,
        },
        beneficiary: BENEFICIARY,
        payment_token: TOKEN,
        owner: OWNER,
        bidding_duration: DURATION,
        stoppable,
    }
}

pub fn collaborators() -> (Collaborators, Arc<MockFhe>, Arc<RecordingLedger>, Arc<StaticRegistry>) {
    let fhe = Arc::new(MockFhe::new());
    let ledger = Arc::new(RecordingLedger::default());
    let registry = Arc::new(StaticRegistry::with_asset(ASSET_ID, OWNER));
    let env = Collaborators::new(fhe.clone(), ledger.clone(), registry.clone());
    (env, fhe, ledger, registry)
}

/// Module state of an auction created at time 0 and open for bids.
pub fn fixture(stoppable: bool) -> Fixture {
    let (env, fhe, ledger, registry) = collaborators();
    let mut auction = AuctionRecord::new(&params(stoppable), 0, DURATION, fhe.as_ref());
    open_bidding(&mut auction);

    Fixture {
        state: ModuleState::new(auction),
        env,
        fhe,
        ledger,
        registry,
    }
}

pub fn ctx(sender: Address, timestamp: u64) -> CallContext {
    CallContext { sender, timestamp }
}
