//! BlobStore trait: the abstract interface for content-addressed blob hosting.
//!
//! This trait keeps the publish and view pipelines storage-agnostic.
//! Implementations include the HTTP publisher/aggregator pair (primary),
//! the chain-coupled three-phase flow, and an in-memory store for tests.

use async_trait::async_trait;
use bytes::Bytes;

use tuber_core::BlobId;

use crate::error::Result;

/// The BlobStore trait: async interface for blob upload and retrieval.
///
/// # Design Notes
///
/// - **Content addressing**: the host derives the blob id from the bytes;
///   uploading the same bytes twice returns the same id.
/// - **Deduplication is not an error**: a host may answer that the blob was
///   already certified. Callers receive the id either way.
/// - **Epochs**: every upload carries a storage lifetime in epochs, chosen
///   once per deployment.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a blob, keeping it alive for `epochs` storage epochs.
    ///
    /// Returns the host-assigned blob id.
    async fn upload(&self, bytes: Bytes, epochs: u32) -> Result<BlobId>;

    /// Upload several blobs in order.
    ///
    /// Sequential by default; the returned ids line up with the inputs.
    /// Any failure aborts the batch and nothing after it is uploaded.
    async fn upload_many(&self, blobs: Vec<Bytes>, epochs: u32) -> Result<Vec<BlobId>> {
        let mut ids = Vec::with_capacity(blobs.len());
        for bytes in blobs {
            ids.push(self.upload(bytes, epochs).await?);
        }
        Ok(ids)
    }

    /// Download a blob by id.
    async fn download(&self, blob_id: &BlobId) -> Result<Bytes>;

    /// The stable retrieval URL for a blob id.
    ///
    /// Pure: no network traffic, usable for media elements that fetch
    /// lazily on their own.
    fn url_for(&self, blob_id: &BlobId) -> String;
}
