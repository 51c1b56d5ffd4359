//! Gate for every disclosure of a confidential value.
//!
//! Public fields (state, deadline, beneficiary, bid count, the revealed
//! winner) are plain accessors. Anything encrypted leaves the auction only
//! through this gate, sealed to the key of a viewer who proved they own it
//! and who owns the data.

use tracing::warn;

use vickrey_crypto::{verify_authorization, FheBackend};
use vickrey_types::{address_of, Address, Ebool, Euint64, SealedValue, ViewerAuthorization};

use crate::error::AuctionError;
use crate::handlers::HandlerResult;

/// Access gate of one auction instance.
pub struct AccessGate<'a> {
    domain: &'a Address,
}

impl<'a> AccessGate<'a> {
    /// Gate scoped to the auction identified by `domain`.
    pub fn new(domain: &'a Address) -> Self {
        Self { domain }
    }

    /// Check that `authorization` proves `requester` holds the presented key
    /// and signed for this auction.
    pub fn admit(
        &self,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<()> {
        if address_of(&authorization.public_key) != *requester {
            warn!(requester = %hex::encode(requester), "Viewer key does not match requester");
            return Err(AuctionError::Unauthorized);
        }

        verify_authorization(authorization, self.domain).map_err(|e| {
            warn!(requester = %hex::encode(requester), error = %e, "Rejected viewer authorization");
            AuctionError::Unauthorized
        })
    }

    /// Disclose an owner-scoped integer to its owner.
    pub fn disclose_u64(
        &self,
        fhe: &dyn FheBackend,
        value: &Euint64,
        owner: &Address,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<SealedValue> {
        self.admit_owner(owner, requester, authorization)?;
        Ok(fhe.reencrypt_u64(value, &authorization.public_key)?)
    }

    /// Disclose an owner-scoped boolean to its owner.
    pub fn disclose_bool(
        &self,
        fhe: &dyn FheBackend,
        value: &Ebool,
        owner: &Address,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<SealedValue> {
        self.admit_owner(owner, requester, authorization)?;
        Ok(fhe.reencrypt_bool(value, &authorization.public_key)?)
    }

    fn admit_owner(
        &self,
        owner: &Address,
        requester: &Address,
        authorization: &ViewerAuthorization,
    ) -> HandlerResult<()> {
        self.admit(requester, authorization)?;
        if owner != requester {
            return Err(AuctionError::Unauthorized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use vickrey_crypto::{open, MockFhe, ViewingKey};

    const DOMAIN: Address = [5u8; 32];

    #[test]
    fn test_owner_can_read() {
        let fhe = MockFhe::new();
        let key = ViewingKey::generate(&mut OsRng);
        let owner = key.address();
        let value = fhe.encrypt_u64(20);

        let gate = AccessGate::new(&DOMAIN);
        let sealed = gate
            .disclose_u64(&fhe, &value, &owner, &owner, &key.authorize(&DOMAIN))
            .unwrap();

        assert_eq!(open(&sealed, &key).unwrap(), 20u64.to_le_bytes());
    }

    #[test]
    fn test_other_viewer_rejected() {
        let fhe = MockFhe::new();
        let owner_key = ViewingKey::generate(&mut OsRng);
        let other_key = ViewingKey::generate(&mut OsRng);
        let value = fhe.encrypt_u64(20);

        let gate = AccessGate::new(&DOMAIN);
        let result = gate.disclose_u64(
            &fhe,
            &value,
            &owner_key.address(),
            &other_key.address(),
            &other_key.authorize(&DOMAIN),
        );

        assert_eq!(result, Err(AuctionError::Unauthorized));
    }

    #[test]
    fn test_borrowed_key_rejected() {
        let owner_key = ViewingKey::generate(&mut OsRng);
        let other_key = ViewingKey::generate(&mut OsRng);

        // Owner's identity claimed with someone else's authorization
        let gate = AccessGate::new(&DOMAIN);
        let result = gate.admit(&owner_key.address(), &other_key.authorize(&DOMAIN));

        assert_eq!(result, Err(AuctionError::Unauthorized));
    }

    #[test]
    fn test_wrong_domain_rejected() {
        let key = ViewingKey::generate(&mut OsRng);

        let gate = AccessGate::new(&DOMAIN);
        let result = gate.admit(&key.address(), &key.authorize(&[6u8; 32]));

        assert_eq!(result, Err(AuctionError::Unauthorized));
    }
}
