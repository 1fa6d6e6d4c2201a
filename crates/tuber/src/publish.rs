//! The publish pipeline.
//!
//! A strict sequential chain: validate, upload media, build the envelope,
//! seal it, upload the payload, then write the on-chain pointer. Each
//! step's confirmed output is a required input to the next, so no step
//! starts before its predecessor finishes. In particular the pointer is
//! written only after the payload upload has fully finalized; a pointer
//! to an unconfirmed blob is a dangling reference the storage network
//! never promises to resolve.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use tuber_chain::{ChainWriter, LedgerReader, Wallet};
use tuber_core::{
    validate_post_input, BlobId, MediaRef, PolicyId, PostEnvelope, PostInput, ProfileId, TxDigest,
};
use tuber_seal::seal_encrypt;
use tuber_store::BlobStore;

use crate::config::DeploymentConfig;
use crate::error::{Result, TuberError};

/// A publish job: the target profile, the content, and the gate choice.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub profile_id: ProfileId,
    pub post: PostInput,
    /// Sealed for subscribers, or public plaintext.
    pub encrypted: bool,
}

/// What a completed publish leaves behind.
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    /// The payload blob the on-chain pointer references.
    pub blob_id: BlobId,
    /// Digest of the confirmed pointer transaction.
    pub digest: TxDigest,
    /// References to the uploaded media blobs, in input order.
    pub media: Vec<MediaRef>,
    pub encrypted: bool,
}

/// The creator-side pipeline.
pub struct Publisher {
    store: Arc<dyn BlobStore>,
    writer: ChainWriter,
    config: DeploymentConfig,
    // One publish at a time per publisher instance.
    in_flight: Mutex<()>,
}

impl Publisher {
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        wallet: Arc<dyn Wallet>,
        store: Arc<dyn BlobStore>,
        config: DeploymentConfig,
    ) -> Self {
        let writer = ChainWriter::new(reader, wallet, config.call_targets(), config.clock_id);
        Self {
            store,
            writer,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// The underlying chain writer, for profile management operations.
    pub fn writer(&self) -> &ChainWriter {
        &self.writer
    }

    /// Run the full publish pipeline for one post.
    #[instrument(skip(self, request), fields(profile = %request.profile_id))]
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| TuberError::PublishInProgress)?;

        validate_post_input(&request.post)?;

        let media = self.upload_media(&request.post).await?;

        let envelope = PostEnvelope {
            title: request.post.title.clone(),
            preview: request.post.preview.clone(),
            content: request.post.content.clone(),
            media_files: media.clone(),
        };
        let envelope_bytes = envelope.encode()?;

        let payload = if request.encrypted {
            let policy_id = PolicyId::derive(request.profile_id, self.config.policy_nonce);
            seal_encrypt(&envelope_bytes, policy_id, &self.config.server_group)?
        } else {
            envelope_bytes
        };

        let blob_id = self
            .store
            .upload(Bytes::from(payload), self.config.storage_epochs)
            .await?;

        // The upload above has finalized; only now may the pointer exist.
        let digest = self
            .writer
            .publish_pointer(
                request.profile_id,
                &request.post.title,
                &request.post.preview,
                &blob_id,
                request.encrypted,
            )
            .await?;

        info!(%blob_id, %digest, encrypted = request.encrypted, "post published");
        Ok(PublishReceipt {
            blob_id,
            digest,
            media,
            encrypted: request.encrypted,
        })
    }

    /// Upload every media file, in order, before the envelope is built.
    ///
    /// Any failure aborts the whole publish; no envelope ever references
    /// a blob id that was not confirmed.
    async fn upload_media(&self, post: &PostInput) -> Result<Vec<MediaRef>> {
        let mut media = Vec::with_capacity(post.media.len());
        for upload in &post.media {
            let blob_id = self
                .store
                .upload(upload.bytes.clone(), self.config.storage_epochs)
                .await?;
            media.push(MediaRef {
                blob_id,
                kind: upload.kind,
            });
        }
        Ok(media)
    }
}
