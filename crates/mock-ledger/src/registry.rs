//! Non-fungible asset registry with operator approvals.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use vickrey_module::{AssetRegistry, RegistryError};
use vickrey_types::Address;

#[derive(Default)]
struct RegistryState {
    owners: HashMap<u64, Address>,
    /// (owner, operator) pairs approved for all of the owner's assets
    operators: HashSet<(Address, Address)>,
    /// Receivers that refuse incoming assets
    rejecting: HashSet<Address>,
}

pub struct MockAssetRegistry {
    registry_id: Address,
    state: RwLock<RegistryState>,
}

impl MockAssetRegistry {
    pub fn new(registry_id: Address) -> Self {
        Self {
            registry_id,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn registry_id(&self) -> Address {
        self.registry_id
    }

    /// Create `asset_id` owned by `to`.
    pub fn mint(&self, asset_id: u64, to: &Address) {
        self.state.write().owners.insert(asset_id, *to);
        debug!(asset_id, to = %hex::encode(to), "Asset minted");
    }

    /// Allow `operator` to move every asset of `owner`.
    pub fn set_approval_for_all(&self, owner: &Address, operator: &Address, approved: bool) {
        let mut state = self.state.write();
        if approved {
            state.operators.insert((*owner, *operator));
        } else {
            state.operators.remove(&(*owner, *operator));
        }
    }

    /// Make `receiver` refuse incoming transfers.
    pub fn reject_receiver(&self, receiver: &Address, reject: bool) {
        let mut state = self.state.write();
        if reject {
            state.rejecting.insert(*receiver);
        } else {
            state.rejecting.remove(receiver);
        }
    }
}

impl AssetRegistry for MockAssetRegistry {
    fn transfer(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        asset_id: u64,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let owner = *state
            .owners
            .get(&asset_id)
            .ok_or(RegistryError::UnknownAsset(asset_id))?;

        let approved = operator == from || state.operators.contains(&(*from, *operator));
        if owner != *from || !approved || state.rejecting.contains(to) {
            warn!(asset_id, operator = %hex::encode(operator), "Asset transfer refused");
            return Err(RegistryError::NotOwnerOrNotApproved);
        }

        state.owners.insert(asset_id, *to);
        debug!(asset_id, to = %hex::encode(to), "Asset transferred");
        Ok(())
    }

    fn owner_of(&self, asset_id: u64) -> Result<Address, RegistryError> {
        self.state
            .read()
            .owners
            .get(&asset_id)
            .copied()
            .ok_or(RegistryError::UnknownAsset(asset_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = [1u8; 32];
    const OPERATOR: Address = [2u8; 32];
    const BUYER: Address = [3u8; 32];

    #[test]
    fn test_operator_transfer_needs_approval() {
        let registry = MockAssetRegistry::new([9u8; 32]);
        registry.mint(1, &OWNER);

        let result = registry.transfer(&OPERATOR, &OWNER, &BUYER, 1);
        assert_eq!(result, Err(RegistryError::NotOwnerOrNotApproved));

        registry.set_approval_for_all(&OWNER, &OPERATOR, true);
        registry.transfer(&OPERATOR, &OWNER, &BUYER, 1).unwrap();
        assert_eq!(registry.owner_of(1).unwrap(), BUYER);
    }

    #[test]
    fn test_transfer_from_non_owner_refused() {
        let registry = MockAssetRegistry::new([9u8; 32]);
        registry.mint(1, &OWNER);

        let result = registry.transfer(&BUYER, &BUYER, &OPERATOR, 1);
        assert_eq!(result, Err(RegistryError::NotOwnerOrNotApproved));
    }

    #[test]
    fn test_unknown_asset() {
        let registry = MockAssetRegistry::new([9u8; 32]);
        assert_eq!(registry.owner_of(5), Err(RegistryError::UnknownAsset(5)));
    }

    #[test]
    fn test_rejecting_receiver() {
        let registry = MockAssetRegistry::new([9u8; 32]);
        registry.mint(1, &OWNER);
        registry.reject_receiver(&BUYER, true);

        assert!(registry.transfer(&OWNER, &OWNER, &BUYER, 1).is_err());
        assert_eq!(registry.owner_of(1).unwrap(), OWNER);
    }
}
