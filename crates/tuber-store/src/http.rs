//! Stateless HTTP blob store.
//!
//! Talks to a trusted publisher for uploads and an aggregator for reads.
//! The publisher answers `PUT /v1/blobs?epochs=N` with either a
//! `newlyCreated` or an `alreadyCertified` body; both carry the blob id
//! and both count as success, since the network deduplicates by content.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info};

use tuber_core::BlobId;

use crate::error::{Result, StoreError};
use crate::traits::BlobStore;

/// Blob store backed by a publisher/aggregator HTTP pair.
pub struct HttpBlobStore {
    client: reqwest::Client,
    publisher_base: String,
    aggregator_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreResponse {
    newly_created: Option<NewlyCreated>,
    already_certified: Option<AlreadyCertified>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
}

impl StoreResponse {
    fn blob_id(self) -> Option<BlobId> {
        if let Some(created) = self.newly_created {
            return Some(BlobId::new(created.blob_object.blob_id));
        }
        self.already_certified
            .map(|existing| BlobId::new(existing.blob_id))
    }
}

impl HttpBlobStore {
    /// Create a store over a publisher and an aggregator base URL.
    ///
    /// Trailing slashes on either base are tolerated.
    pub fn new(publisher_base: impl Into<String>, aggregator_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            publisher_base: trim_base(publisher_base.into()),
            aggregator_base: trim_base(aggregator_base.into()),
        }
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, bytes: Bytes, epochs: u32) -> Result<BlobId> {
        let url = format!("{}/v1/blobs?epochs={}", self.publisher_base, epochs);
        let size = bytes.len();

        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::UploadFailed(format!(
                "publisher returned {status}"
            )));
        }

        let parsed: StoreResponse = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;

        let blob_id = parsed.blob_id().ok_or_else(|| {
            StoreError::UnexpectedResponse(
                "neither newlyCreated nor alreadyCertified in store response".to_string(),
            )
        })?;

        info!(blob_id = %blob_id.as_str(), size, epochs, "blob uploaded");
        Ok(blob_id)
    }

    async fn download(&self, blob_id: &BlobId) -> Result<Bytes> {
        let url = self.url_for(blob_id);
        debug!(blob_id = %blob_id.as_str(), "fetching blob");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(blob_id.clone()));
        }
        if !status.is_success() {
            return Err(StoreError::FetchFailed(format!(
                "aggregator returned {status}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| StoreError::FetchFailed(e.to_string()))
    }

    fn url_for(&self, blob_id: &BlobId) -> String {
        format!("{}/v1/blobs/{}", self.aggregator_base, blob_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_is_pure_and_trims_trailing_slash() {
        let store = HttpBlobStore::new("http://pub.example/", "http://agg.example/");
        assert_eq!(
            store.url_for(&BlobId::new("abc123")),
            "http://agg.example/v1/blobs/abc123"
        );
    }

    #[test]
    fn parses_newly_created_response() {
        let body = r#"{"newlyCreated":{"blobObject":{"blobId":"b1","size":42}}}"#;
        let parsed: StoreResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.blob_id().unwrap().as_str(), "b1");
    }

    #[test]
    fn parses_already_certified_response() {
        let body = r#"{"alreadyCertified":{"blobId":"b2","endEpoch":9}}"#;
        let parsed: StoreResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.blob_id().unwrap().as_str(), "b2");
    }

    #[test]
    fn rejects_response_with_neither_variant() {
        let body = r#"{"somethingElse":true}"#;
        let parsed: StoreResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.blob_id().is_none());
    }
}
