//! Chain-coupled blob writes.
//!
//! The trust-minimized storage path ties every upload to the ledger: the
//! blob is encoded locally, registered by a wallet-signed transaction,
//! handed to the storage host together with the register digest, and
//! finally certified by a second transaction. [`WriteFlow`] enforces that
//! phase order; [`ChainBlobStore`] drives it behind the ordinary
//! [`BlobStore`] interface so callers never see the phases.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use tuber_chain::{CallArg, TransactionKind, Wallet};
use tuber_core::{BlobId, ObjectId, TxDigest};

use crate::error::{Result, StoreError};
use crate::traits::BlobStore;

/// Fully-qualified targets of the storage entrypoints for one package.
#[derive(Debug, Clone)]
pub struct StoreTargets {
    pub register: String,
    pub certify: String,
}

impl StoreTargets {
    /// Targets for the storage module of a published package.
    pub fn for_package(package_id: ObjectId) -> Self {
        let pkg = package_id.to_hex();
        Self {
            register: format!("{pkg}::blob::register"),
            certify: format!("{pkg}::blob::certify"),
        }
    }
}

/// Where the bytes physically land once their registration has confirmed.
///
/// The storage host accepts the bytes only alongside the digest of the
/// register transaction, which is its proof that storage was paid for.
#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Store the bytes of a registered blob.
    async fn put(&self, blob_id: &BlobId, bytes: Bytes, upload_key: &TxDigest) -> Result<()>;

    /// Retrieve previously stored bytes.
    async fn get(&self, blob_id: &BlobId) -> Result<Bytes>;
}

/// The phases of one chain-coupled write, in the only order they may run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Encoded,
    Registered { digest: TxDigest },
    Uploaded,
    Certified,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Encoded => "encoded",
            Phase::Registered { .. } => "registered",
            Phase::Uploaded => "uploaded",
            Phase::Certified => "certified",
        }
    }
}

/// State machine for a single blob's register, upload, certify sequence.
///
/// Each transition consumes the previous phase; skipping or repeating a
/// phase is a [`StoreError::FlowOutOfOrder`], caught before any wallet
/// prompt or network call is made.
pub struct WriteFlow {
    blob_id: BlobId,
    bytes: Bytes,
    epochs: u32,
    phase: Phase,
}

impl WriteFlow {
    /// Encode bytes into a flow. The blob id is derived from the content.
    pub fn encode(bytes: Bytes, epochs: u32) -> Self {
        let blob_id = BlobId::new(hex::encode(blake3::hash(&bytes).as_bytes()));
        Self {
            blob_id,
            bytes,
            epochs,
            phase: Phase::Encoded,
        }
    }

    /// The content-derived id this flow will produce.
    pub fn blob_id(&self) -> &BlobId {
        &self.blob_id
    }

    fn expect_phase(&self, expected: &'static str) -> Result<()> {
        if self.phase.name() == expected {
            Ok(())
        } else {
            Err(StoreError::FlowOutOfOrder {
                expected,
                got: self.phase.name(),
            })
        }
    }

    /// Phase 1: register the blob on chain through the wallet.
    pub async fn register(&mut self, wallet: &dyn Wallet, targets: &StoreTargets) -> Result<()> {
        self.expect_phase("encoded")?;

        let kind = TransactionKind::new().move_call(
            &targets.register,
            vec![
                CallArg::pure_string(self.blob_id.as_str()),
                CallArg::pure_u64(self.epochs as u64),
            ],
        );
        let digest = wallet.sign_and_execute(kind).await?;
        debug!(blob_id = %self.blob_id, %digest, "blob registered");

        self.phase = Phase::Registered { digest };
        Ok(())
    }

    /// Phase 2: hand the bytes to the storage host with the register digest.
    pub async fn upload(&mut self, sink: &dyn BlobSink) -> Result<()> {
        let digest = match &self.phase {
            Phase::Registered { digest } => *digest,
            other => {
                return Err(StoreError::FlowOutOfOrder {
                    expected: "registered",
                    got: other.name(),
                })
            }
        };

        sink.put(&self.blob_id, self.bytes.clone(), &digest).await?;
        self.phase = Phase::Uploaded;
        Ok(())
    }

    /// Phase 3: certify availability on chain, completing the flow.
    pub async fn certify(&mut self, wallet: &dyn Wallet, targets: &StoreTargets) -> Result<()> {
        self.expect_phase("uploaded")?;

        let kind = TransactionKind::new().move_call(
            &targets.certify,
            vec![CallArg::pure_string(self.blob_id.as_str())],
        );
        wallet.sign_and_execute(kind).await?;

        self.phase = Phase::Certified;
        Ok(())
    }

    /// Finish, yielding the blob id. Fails unless certification completed.
    pub fn finish(self) -> Result<BlobId> {
        self.expect_phase("certified")?;
        Ok(self.blob_id)
    }
}

/// Blob store that drives the three-phase flow for every upload.
pub struct ChainBlobStore {
    wallet: Arc<dyn Wallet>,
    sink: Arc<dyn BlobSink>,
    targets: StoreTargets,
    aggregator_base: String,
}

impl ChainBlobStore {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        sink: Arc<dyn BlobSink>,
        targets: StoreTargets,
        aggregator_base: impl Into<String>,
    ) -> Self {
        let mut aggregator_base = aggregator_base.into();
        while aggregator_base.ends_with('/') {
            aggregator_base.pop();
        }
        Self {
            wallet,
            sink,
            targets,
            aggregator_base,
        }
    }
}

#[async_trait]
impl BlobStore for ChainBlobStore {
    async fn upload(&self, bytes: Bytes, epochs: u32) -> Result<BlobId> {
        let mut flow = WriteFlow::encode(bytes, epochs);
        flow.register(self.wallet.as_ref(), &self.targets).await?;
        flow.upload(self.sink.as_ref()).await?;
        flow.certify(self.wallet.as_ref(), &self.targets).await?;
        let blob_id = flow.finish()?;
        info!(blob_id = %blob_id, epochs, "chain-coupled blob write complete");
        Ok(blob_id)
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Bytes> {
        self.sink.get(blob_id).await
    }

    fn url_for(&self, blob_id: &BlobId) -> String {
        format!("{}/v1/blobs/{}", self.aggregator_base, blob_id.as_str())
    }
}
