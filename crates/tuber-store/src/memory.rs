//! In-memory implementation of the BlobStore trait.
//!
//! Primarily for testing. Content addressing matches the real network:
//! the id is derived from the bytes, so duplicate uploads return the
//! same id without error. Upload failure can be injected to exercise
//! short-circuit paths in the publish pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use tuber_core::{BlobId, TxDigest};

use crate::error::{Result, StoreError};
use crate::flow::BlobSink;
use crate::traits::BlobStore;

/// In-memory blob store. Thread-safe via RwLock.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Bytes>>,
    fail_uploads: AtomicBool,
    upload_count: AtomicU64,
}

impl MemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
            upload_count: AtomicU64::new(0),
        }
    }

    /// Make every subsequent upload fail (or succeed again).
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// How many uploads have been attempted, failed ones included.
    pub fn upload_count(&self) -> u64 {
        self.upload_count.load(Ordering::SeqCst)
    }

    /// Whether bytes are stored under an id.
    pub fn contains(&self, blob_id: &BlobId) -> bool {
        self.blobs.read().unwrap().contains_key(blob_id)
    }

    fn store(&self, bytes: Bytes) -> Result<BlobId> {
        self.upload_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::UploadFailed("injected failure".to_string()));
        }
        let blob_id = BlobId::new(hex::encode(blake3::hash(&bytes).as_bytes()));
        self.blobs.write().unwrap().insert(blob_id.clone(), bytes);
        Ok(blob_id)
    }

    fn fetch(&self, blob_id: &BlobId) -> Result<Bytes> {
        self.blobs
            .read()
            .unwrap()
            .get(blob_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(blob_id.clone()))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Bytes, _epochs: u32) -> Result<BlobId> {
        self.store(bytes)
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Bytes> {
        self.fetch(blob_id)
    }

    fn url_for(&self, blob_id: &BlobId) -> String {
        format!("memory://blobs/{}", blob_id.as_str())
    }
}

#[async_trait]
impl BlobSink for MemoryBlobStore {
    async fn put(&self, blob_id: &BlobId, bytes: Bytes, _upload_key: &TxDigest) -> Result<()> {
        self.upload_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::UploadFailed("injected failure".to_string()));
        }
        self.blobs
            .write()
            .unwrap()
            .insert(blob_id.clone(), bytes);
        Ok(())
    }

    async fn get(&self, blob_id: &BlobId) -> Result<Bytes> {
        self.fetch(blob_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download_roundtrips() {
        let store = MemoryBlobStore::new();
        let id = store.upload(Bytes::from_static(b"payload"), 3).await.unwrap();
        let bytes = store.download(&id).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }

    #[tokio::test]
    async fn duplicate_upload_returns_same_id() {
        let store = MemoryBlobStore::new();
        let a = store.upload(Bytes::from_static(b"same"), 3).await.unwrap();
        let b = store.upload(Bytes::from_static(b"same"), 3).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_upload_failed() {
        let store = MemoryBlobStore::new();
        store.set_fail_uploads(true);
        let err = store.upload(Bytes::from_static(b"x"), 3).await.unwrap_err();
        assert!(matches!(err, StoreError::UploadFailed(_)));
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn download_of_unknown_id_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.download(&BlobId::new("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn upload_many_stops_at_first_failure() {
        let store = MemoryBlobStore::new();
        store.set_fail_uploads(true);
        let blobs = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        assert!(store.upload_many(blobs, 3).await.is_err());
        assert_eq!(store.upload_count(), 1);
    }
}
