//! Test fixtures and helpers.
//!
//! Common setup for pipeline integration tests: an in-memory ledger, an
//! in-memory blob store, and a key-server group wired to both.

use std::sync::Arc;

use async_trait::async_trait;

use tuber_chain::{
    ChainError, ChainWriter, Ed25519Signature, Keypair, LedgerReader, LocalWallet, MemoryLedger,
    TransactionKind, Wallet,
};
use tuber_core::{Address, ClockId, ObjectId, PolicyNonce, ProfileId, SubscriptionId, TxDigest};
use tuber_seal::{KeyServer, KeyServerEntry, MemoryKeyServer, ServerGroup, X25519StaticSecret};
use tuber_store::MemoryBlobStore;

/// The package id all fixture call targets derive from.
pub const TEST_PACKAGE: ObjectId = ObjectId::from_bytes([0xaa; 32]);

/// Default tier price used by fixture creators.
pub const TEST_PRICE: u64 = 1_000;

/// A full pipeline fixture: ledger, blob store, and key-server group.
pub struct TestFixture {
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<MemoryBlobStore>,
    pub servers: Vec<Arc<MemoryKeyServer>>,
    pub group: ServerGroup,
    pub policy_nonce: PolicyNonce,
}

impl TestFixture {
    /// Three single-weight servers at threshold two.
    pub fn new() -> Self {
        Self::with_group(3, 2)
    }

    /// A custom group of `servers` single-weight servers.
    pub fn with_group(servers: usize, threshold: u16) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let policy_nonce = PolicyNonce::ZERO;

        let secrets: Vec<X25519StaticSecret> =
            (0..servers).map(|_| X25519StaticSecret::generate()).collect();
        let entries: Vec<KeyServerEntry> = secrets
            .iter()
            .enumerate()
            .map(|(i, secret)| KeyServerEntry {
                id: ObjectId::from_bytes([0x50 + i as u8; 32]),
                public_key: secret.public_key(),
                weight: 1,
            })
            .collect();
        let group = ServerGroup::new(entries.clone(), threshold)
            .expect("fixture group must validate");

        let key_servers = secrets
            .into_iter()
            .zip(entries)
            .map(|(secret, entry)| {
                Arc::new(MemoryKeyServer::new(
                    entry.id,
                    secret,
                    ledger.clone() as Arc<dyn LedgerReader>,
                    ledger.clock_id(),
                    policy_nonce,
                ))
            })
            .collect();

        Self {
            ledger,
            store: Arc::new(MemoryBlobStore::new()),
            servers: key_servers,
            group,
            policy_nonce,
        }
    }

    /// The fixture's shared clock object id.
    pub fn clock_id(&self) -> ClockId {
        self.ledger.clock_id()
    }

    /// A fresh wallet executing against the fixture ledger.
    pub fn wallet(&self) -> Arc<LocalWallet> {
        Arc::new(LocalWallet::new(Keypair::generate(), self.ledger.clone()))
    }

    /// A deterministic wallet from a seed.
    pub fn wallet_from_seed(&self, seed: [u8; 32]) -> Arc<LocalWallet> {
        Arc::new(LocalWallet::new(
            Keypair::from_seed(&seed),
            self.ledger.clone(),
        ))
    }

    /// The key servers as trait objects, for the decryption gateway.
    pub fn dyn_servers(&self) -> Vec<Arc<dyn KeyServer>> {
        self.servers
            .iter()
            .map(|s| s.clone() as Arc<dyn KeyServer>)
            .collect()
    }

    /// A chain writer for a wallet against the fixture ledger.
    pub fn writer(&self, wallet: Arc<LocalWallet>) -> ChainWriter {
        ChainWriter::new(
            self.ledger.clone(),
            wallet,
            tuber_chain::CallTargets::for_package(TEST_PACKAGE),
            self.clock_id(),
        )
    }

    /// Register a creator profile with a default tier, returning its id.
    pub async fn register_creator(&self, wallet: Arc<LocalWallet>, name: &str) -> ProfileId {
        let owner = wallet.address();
        self.writer(wallet)
            .register(name, "fixture bio", TEST_PRICE)
            .await
            .expect("fixture register must succeed");
        self.ledger
            .list_profiles()
            .await
            .expect("ledger read")
            .into_iter()
            .find(|p| p.owner == owner)
            .expect("profile just registered")
            .id
    }

    /// Subscribe a wallet to a profile, returning the subscription id.
    pub async fn subscribe(
        &self,
        wallet: Arc<LocalWallet>,
        profile_id: ProfileId,
    ) -> SubscriptionId {
        let subscriber = wallet.address();
        self.writer(wallet)
            .subscribe(profile_id, TEST_PRICE)
            .await
            .expect("fixture subscribe must succeed");
        self.ledger
            .subscriptions_of(subscriber)
            .await
            .expect("ledger read")
            .into_iter()
            .find(|s| s.profile_id == profile_id)
            .expect("subscription just created")
            .id
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A wallet that refuses to sign personal messages.
///
/// Transactions still execute; only the session challenge is declined,
/// modeling a user dismissing the signing prompt mid-view.
pub struct DecliningWallet {
    inner: LocalWallet,
}

impl DecliningWallet {
    pub fn new(fixture: &TestFixture) -> Self {
        Self {
            inner: LocalWallet::new(Keypair::generate(), fixture.ledger.clone()),
        }
    }
}

#[async_trait]
impl Wallet for DecliningWallet {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_personal_message(&self, _message: &[u8]) -> Result<Ed25519Signature, ChainError> {
        Err(ChainError::AuthorizationDeclined)
    }

    async fn sign_and_execute(&self, kind: TransactionKind) -> Result<TxDigest, ChainError> {
        self.inner.sign_and_execute(kind).await
    }
}

/// A wallet whose signing transport is broken.
///
/// Unlike [`DecliningWallet`] the failure is a fault, not a user
/// decision, and must not be reported as one.
pub struct FaultyWallet {
    inner: LocalWallet,
}

impl FaultyWallet {
    pub fn new(fixture: &TestFixture) -> Self {
        Self {
            inner: LocalWallet::new(Keypair::generate(), fixture.ledger.clone()),
        }
    }
}

#[async_trait]
impl Wallet for FaultyWallet {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_personal_message(&self, _message: &[u8]) -> Result<Ed25519Signature, ChainError> {
        Err(ChainError::SerializationError("wallet transport down".to_string()))
    }

    async fn sign_and_execute(&self, kind: TransactionKind) -> Result<TxDigest, ChainError> {
        self.inner.sign_and_execute(kind).await
    }
}
