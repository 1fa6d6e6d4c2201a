//! Deployment configuration.
//!
//! One value of this struct describes everything that must agree between
//! publish time and view time for a deployment: the package, the clock,
//! the policy nonce, the storage lifetime, and the key-server group.
//! Constructing it once and passing it to both [`crate::Publisher`] and
//! [`crate::Viewer`] is what rules out the publish/view drift failure
//! class.

use std::sync::Arc;

use tuber_chain::{ApprovalStrategy, CallTargets, Wallet};
use tuber_core::{ClockId, ObjectId, PolicyNonce};
use tuber_seal::ServerGroup;
use tuber_store::{BlobSink, BlobStore, ChainBlobStore, HttpBlobStore, StoreTargets};

/// Which blob write path a deployment uses. Never mixed per publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageStrategy {
    /// Trusted publisher HTTP endpoint.
    #[default]
    Http,
    /// Wallet-signed register and certify transactions around each upload.
    ChainCoupled,
}

/// Everything publish and view must agree on.
#[derive(Clone)]
pub struct DeploymentConfig {
    /// The deployed package all call targets derive from.
    pub package_id: ObjectId,

    /// The shared clock object referenced by entitlement checks.
    pub clock_id: ClockId,

    /// Deployment-constant nonce suffix for policy ids.
    pub policy_nonce: PolicyNonce,

    /// Storage lifetime for every uploaded blob.
    pub storage_epochs: u32,

    /// Session capability time-to-live in minutes.
    pub session_ttl_min: u32,

    /// How approval transactions are produced.
    pub approval_strategy: ApprovalStrategy,

    /// Which blob write path this deployment uses.
    pub storage_strategy: StorageStrategy,

    /// Base URL blobs are uploaded to on the HTTP path.
    pub publisher_base: String,

    /// Base URL media links resolve against.
    pub aggregator_base: String,

    /// The key-server group, identical at publish and view time.
    pub server_group: ServerGroup,
}

impl DeploymentConfig {
    /// Entrypoint targets for the content modules of the package.
    pub fn call_targets(&self) -> CallTargets {
        CallTargets::for_package(self.package_id)
    }

    /// Entrypoint targets for the storage module of the package.
    pub fn store_targets(&self) -> StoreTargets {
        StoreTargets::for_package(self.package_id)
    }

    /// Build the blob store the configured strategy names.
    ///
    /// The chain-coupled path signs its register and certify transactions
    /// with `wallet` and moves bytes through `sink`; the HTTP path ignores
    /// both.
    pub fn blob_store(&self, wallet: Arc<dyn Wallet>, sink: Arc<dyn BlobSink>) -> Arc<dyn BlobStore> {
        match self.storage_strategy {
            StorageStrategy::Http => Arc::new(HttpBlobStore::new(
                self.publisher_base.clone(),
                self.aggregator_base.clone(),
            )),
            StorageStrategy::ChainCoupled => Arc::new(ChainBlobStore::new(
                wallet,
                sink,
                self.store_targets(),
                self.aggregator_base.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tuber_core::BlobId;
    use tuber_testkit::{TestFixture, TEST_PACKAGE};

    fn config_with(strategy: StorageStrategy, fixture: &TestFixture) -> DeploymentConfig {
        DeploymentConfig {
            package_id: TEST_PACKAGE,
            clock_id: fixture.clock_id(),
            policy_nonce: fixture.policy_nonce,
            storage_epochs: 3,
            session_ttl_min: 10,
            approval_strategy: ApprovalStrategy::BuildOnly,
            storage_strategy: strategy,
            publisher_base: "http://publisher.localhost".to_string(),
            aggregator_base: "http://aggregator.localhost".to_string(),
            server_group: fixture.group.clone(),
        }
    }

    #[test]
    fn http_strategy_resolves_media_against_the_aggregator() {
        let fixture = TestFixture::new();
        let config = config_with(StorageStrategy::Http, &fixture);
        let wallet: Arc<dyn Wallet> = fixture.wallet();
        let sink: Arc<dyn BlobSink> = fixture.store.clone();
        let store = config.blob_store(wallet, sink);
        assert_eq!(
            store.url_for(&BlobId::new("abc")),
            "http://aggregator.localhost/v1/blobs/abc"
        );
    }

    #[tokio::test]
    async fn chain_coupled_strategy_certifies_through_the_ledger() {
        let fixture = TestFixture::new();
        let config = config_with(StorageStrategy::ChainCoupled, &fixture);
        let wallet: Arc<dyn Wallet> = fixture.wallet();
        let sink: Arc<dyn BlobSink> = fixture.store.clone();
        let store = config.blob_store(wallet, sink);

        let blob_id = store
            .upload(Bytes::from_static(b"payload"), config.storage_epochs)
            .await
            .unwrap();
        assert!(fixture.ledger.is_blob_certified(blob_id.as_str()));
    }
}
