//! Ledger write operations.
//!
//! `ChainWriter` builds and submits the state-changing transactions of the
//! system: creator registration, tier addition, paid subscription, and the
//! post pointer write that ends every publish. All submissions go through
//! the wallet seam and wait for finality; a rejected transaction surfaces
//! the chain's abort reason and is never retried here.

use std::sync::Arc;

use tracing::info;

use tuber_core::{validate_tier, BlobId, ClockId, ProfileId, TxDigest};

use crate::error::{ChainError, Result};
use crate::ledger::LedgerReader;
use crate::tx::{CallArg, CallTargets, TransactionKind};
use crate::wallet::Wallet;

/// Writes creator-side and subscriber-side transactions to the ledger.
pub struct ChainWriter {
    reader: Arc<dyn LedgerReader>,
    wallet: Arc<dyn Wallet>,
    targets: CallTargets,
    clock_id: ClockId,
}

impl ChainWriter {
    /// Create a writer over a ledger reader and a wallet.
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        wallet: Arc<dyn Wallet>,
        targets: CallTargets,
        clock_id: ClockId,
    ) -> Self {
        Self {
            reader,
            wallet,
            targets,
            clock_id,
        }
    }

    /// Register the wallet's address as a creator.
    pub async fn register(&self, name: &str, bio: &str, price: u64) -> Result<TxDigest> {
        let kind = TransactionKind::new().move_call(
            &self.targets.register,
            vec![
                CallArg::pure_string(name),
                CallArg::pure_string(bio),
                CallArg::pure_u64(price),
                CallArg::Object(self.clock_id.object_id()),
            ],
        );
        self.wallet.sign_and_execute(kind).await
    }

    /// Append a subscription tier to the wallet's profile.
    pub async fn add_tier(
        &self,
        profile_id: ProfileId,
        duration_ms: u64,
        price: u64,
    ) -> Result<TxDigest> {
        validate_tier(duration_ms, price).map_err(|e| ChainError::TxAborted(e.to_string()))?;
        let cap = self
            .reader
            .find_creator_cap(self.wallet.address())
            .await?
            .ok_or(ChainError::CreatorCapNotFound)?;

        let kind = TransactionKind::new().move_call(
            &self.targets.add_tier,
            vec![
                CallArg::Object(cap.id.object_id()),
                CallArg::Object(profile_id.object_id()),
                CallArg::pure_u64(duration_ms),
                CallArg::pure_u64(price),
            ],
        );
        self.wallet.sign_and_execute(kind).await
    }

    /// Subscribe to a profile, paying `price` from the wallet.
    pub async fn subscribe(&self, profile_id: ProfileId, price: u64) -> Result<TxDigest> {
        let kind = TransactionKind::new().move_call(
            &self.targets.subscribe,
            vec![
                CallArg::Object(profile_id.object_id()),
                CallArg::Payment(price),
                CallArg::Object(self.clock_id.object_id()),
            ],
        );
        self.wallet.sign_and_execute(kind).await
    }

    /// Record a post pointer against the wallet's profile.
    ///
    /// The caller must only pass a `blob_id` whose upload has already
    /// reached finality; the publish pipeline enforces this ordering.
    /// Returns after the transaction itself is final.
    pub async fn publish_pointer(
        &self,
        profile_id: ProfileId,
        title: &str,
        preview: &str,
        blob_id: &BlobId,
        encrypted: bool,
    ) -> Result<TxDigest> {
        let cap = self
            .reader
            .find_creator_cap(self.wallet.address())
            .await?
            .ok_or(ChainError::CreatorCapNotFound)?;

        let kind = TransactionKind::new().move_call(
            &self.targets.publish_post,
            vec![
                CallArg::Object(cap.id.object_id()),
                CallArg::Object(profile_id.object_id()),
                CallArg::pure_string(title),
                CallArg::pure_string(preview),
                CallArg::pure_string(blob_id.as_str()),
                CallArg::pure_bool(encrypted),
                CallArg::Object(self.clock_id.object_id()),
            ],
        );
        let digest = self.wallet.sign_and_execute(kind).await?;
        info!(profile = %profile_id, blob = %blob_id, digest = %digest, "post pointer written");
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::memory::MemoryLedger;
    use crate::wallet::LocalWallet;
    use tuber_core::ObjectId;

    fn writer_for(
        ledger: &Arc<MemoryLedger>,
        keypair: Keypair,
    ) -> (ChainWriter, Arc<LocalWallet>) {
        let wallet = Arc::new(LocalWallet::new(keypair, ledger.clone()));
        let writer = ChainWriter::new(
            ledger.clone(),
            wallet.clone(),
            CallTargets::for_package(ObjectId::from_bytes([0xaa; 32])),
            ledger.clock_id(),
        );
        (writer, wallet)
    }

    #[tokio::test]
    async fn test_register_then_publish() {
        let ledger = Arc::new(MemoryLedger::new());
        let (writer, wallet) = writer_for(&ledger, Keypair::generate());

        writer.register("alice", "bio", 100).await.unwrap();
        let profile_id = ledger
            .find_creator_cap(wallet.address())
            .await
            .unwrap()
            .unwrap()
            .profile_id;

        writer
            .publish_pointer(profile_id, "T", "P", &BlobId::new("enc1"), true)
            .await
            .unwrap();

        let posts = ledger.get_posts(profile_id).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "T");
        assert_eq!(posts[0].blob_id, BlobId::new("enc1"));
        assert!(posts[0].encrypted);
    }

    #[tokio::test]
    async fn test_publish_without_registration_fails() {
        let ledger = Arc::new(MemoryLedger::new());
        let (writer, _) = writer_for(&ledger, Keypair::generate());

        let err = writer
            .publish_pointer(
                ProfileId::from_bytes([1; 32]),
                "T",
                "P",
                &BlobId::new("b"),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::CreatorCapNotFound));
    }

    #[tokio::test]
    async fn test_add_tier_validates_before_submission() {
        let ledger = Arc::new(MemoryLedger::new());
        let (writer, _) = writer_for(&ledger, Keypair::generate());

        let err = writer
            .add_tier(ProfileId::from_bytes([1; 32]), 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::TxAborted(_)));
    }
}
