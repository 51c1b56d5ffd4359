//! Mock collaborators for local testing of confidential auctions.
//!
//! This provides in-memory versions of the payment ledger and asset registry
//! an auction settles against, without requiring a real chain. Both can be
//! told to fail so retry paths can be exercised.

mod registry;
mod token;

use std::sync::Arc;

use vickrey_crypto::MockFhe;
use vickrey_module::Collaborators;
use vickrey_types::{sha256, Address};

pub use registry::MockAssetRegistry;
pub use token::MockConfidentialToken;

/// A local world: one FHE backend, one token, one registry.
#[derive(Clone)]
pub struct MockWorld {
    pub fhe: Arc<MockFhe>,
    pub token: Arc<MockConfidentialToken>,
    pub registry: Arc<MockAssetRegistry>,
}

impl MockWorld {
    pub fn new() -> Self {
        let fhe = Arc::new(MockFhe::new());
        let token = Arc::new(MockConfidentialToken::new(
            derive_id(b"payment-token"),
            fhe.clone(),
        ));
        let registry = Arc::new(MockAssetRegistry::new(derive_id(b"asset-registry")));
        Self { fhe, token, registry }
    }

    /// Collaborators handed to an auction living in this world.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.fhe.clone(), self.token.clone(), self.registry.clone())
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_id(label: &[u8]) -> Address {
    let mut data = b"VICKREY_MOCK_V1:".to_vec();
    data.extend_from_slice(label);
    sha256(&data)
}
