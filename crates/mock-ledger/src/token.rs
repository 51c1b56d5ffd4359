//! Confidential fungible token.
//!
//! Balances and allowances are encrypted integers. Transfers are computed
//! obliviously (the moved amount is `select(ok, amount, 0)`), and the ledger
//! then decides in the clear whether to accept the result, so a rejected
//! transfer changes nothing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use vickrey_crypto::{verify_authorization, FheBackend};
use vickrey_module::{LedgerError, PaymentLedger};
use vickrey_types::{address_of, Address, Ebool, Euint64, SealedValue, ViewerAuthorization};

#[derive(Default)]
struct TokenState {
    balances: HashMap<Address, Euint64>,
    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address), Euint64>,
}

/// A moved amount, computed but not yet committed.
struct PendingTransfer {
    ok: Ebool,
    from_balance: Euint64,
    to_balance: Euint64,
}

pub struct MockConfidentialToken {
    ledger_id: Address,
    fhe: Arc<dyn FheBackend>,
    state: RwLock<TokenState>,
    fail_payouts: AtomicBool,
}

impl MockConfidentialToken {
    pub fn new(ledger_id: Address, fhe: Arc<dyn FheBackend>) -> Self {
        Self {
            ledger_id,
            fhe,
            state: RwLock::new(TokenState::default()),
            fail_payouts: AtomicBool::new(false),
        }
    }

    /// Identity of the ledger; the domain of balance authorizations.
    pub fn ledger_id(&self) -> Address {
        self.ledger_id
    }

    /// Credit `amount` new tokens to `to`.
    pub fn mint(&self, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let balance = self.balance_in(&state, to);
        let minted = self.fhe.trivial_u64(amount);
        let balance = self.fhe.add(&balance, &minted)?;
        state.balances.insert(*to, balance);
        debug!(to = %hex::encode(to), "Minted");
        Ok(())
    }

    /// Let `spender` pull up to `amount` from `owner`.
    pub fn approve(&self, owner: &Address, spender: &Address, amount: Euint64) {
        self.state.write().allowances.insert((*owner, *spender), amount);
    }

    /// Move `amount` between two holders. Fails without effect if `from`
    /// cannot cover it.
    pub fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let ok = self.fhe.ge(&self.balance_in(&state, from), amount)?;
        let pending = self.compute_transfer(&state, ok, from, to, amount)?;

        if !self.fhe.decrypt_bool(&pending.ok)? {
            return Err(LedgerError::TransferFailed);
        }
        Self::commit(&mut state, from, to, pending);
        Ok(())
    }

    /// Encrypted balance handle of `owner`.
    pub fn balance_of(&self, owner: &Address) -> Euint64 {
        let state = self.state.read();
        self.balance_in(&state, owner)
    }

    /// Make every subsequent payout fail.
    pub fn fail_payouts(&self, fail: bool) {
        self.fail_payouts.store(fail, Ordering::SeqCst);
    }

    fn balance_in(&self, state: &TokenState, owner: &Address) -> Euint64 {
        state
            .balances
            .get(owner)
            .copied()
            .unwrap_or_else(|| self.fhe.trivial_u64(0))
    }

    fn compute_transfer(
        &self,
        state: &TokenState,
        ok: Ebool,
        from: &Address,
        to: &Address,
        amount: &Euint64,
    ) -> Result<PendingTransfer, LedgerError> {
        let zero = self.fhe.trivial_u64(0);
        let moved = self.fhe.select(&ok, amount, &zero)?;

        let from_balance = self.fhe.sub(&self.balance_in(state, from), &moved)?;
        let to_balance = self.fhe.add(&self.balance_in(state, to), &moved)?;

        Ok(PendingTransfer {
            ok,
            from_balance,
            to_balance,
        })
    }

    fn commit(state: &mut TokenState, from: &Address, to: &Address, pending: PendingTransfer) {
        state.balances.insert(*from, pending.from_balance);
        state.balances.insert(*to, pending.to_balance);
    }
}

impl PaymentLedger for MockConfidentialToken {
    fn authorize_and_pull(
        &self,
        spender: &Address,
        payer: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let allowance = state
            .allowances
            .get(&(*payer, *spender))
            .copied()
            .unwrap_or_else(|| self.fhe.trivial_u64(0));

        let allowed = self.fhe.ge(&allowance, amount)?;
        let covered = self.fhe.ge(&self.balance_in(&state, payer), amount)?;
        let ok = self.fhe.and(&allowed, &covered)?;
        let pending = self.compute_transfer(&state, ok, payer, spender, amount)?;

        if !self.fhe.decrypt_bool(&pending.ok)? {
            warn!(payer = %hex::encode(payer), "Pull rejected");
            return Err(LedgerError::InsufficientAllowance);
        }

        let remaining = self.fhe.sub(&allowance, amount)?;
        state.allowances.insert((*payer, *spender), remaining);
        Self::commit(&mut state, payer, spender, pending);
        Ok(())
    }

    fn pay_out(
        &self,
        spender: &Address,
        payee: &Address,
        amount: &Euint64,
    ) -> Result<(), LedgerError> {
        if self.fail_payouts.load(Ordering::SeqCst) {
            warn!(payee = %hex::encode(payee), "Payout failure injected");
            return Err(LedgerError::TransferFailed);
        }
        self.transfer(spender, payee, amount)
    }

    fn balance_query(
        &self,
        owner: &Address,
        authorization: &ViewerAuthorization,
    ) -> Result<SealedValue, LedgerError> {
        if address_of(&authorization.public_key) != *owner {
            return Err(LedgerError::Unauthorized);
        }
        verify_authorization(authorization, &self.ledger_id)
            .map_err(|_| LedgerError::Unauthorized)?;

        let balance = self.balance_of(owner);
        Ok(self.fhe.reencrypt_u64(&balance, &authorization.public_key)?)
    }
}
