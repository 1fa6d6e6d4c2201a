//! The post envelope codec.
//!
//! The envelope is the transient plaintext bundle built just before
//! encryption and reconstructed just after decryption: exclusive text plus
//! references to media blobs. It is serialized as UTF-8 JSON and must never
//! be written to any persistent store in plaintext form.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::BlobId;

/// Kind of a referenced media blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A reference to an uploaded media blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// The blob id returned by the storage upload.
    #[serde(rename = "blobId")]
    pub blob_id: BlobId,

    /// The media kind, used at render time.
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// The plaintext post envelope.
///
/// `title` and `preview` are duplicated on-chain in plaintext; `content`
/// and the media references exist only inside the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostEnvelope {
    pub title: String,
    pub preview: String,
    pub content: String,
    #[serde(rename = "mediaFiles")]
    pub media_files: Vec<MediaRef>,
}

impl PostEnvelope {
    /// Serialize to UTF-8 JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Deserialize from UTF-8 JSON bytes.
    ///
    /// Any missing or mistyped required field is a malformed envelope.
    /// Callers must treat this as equivalent to a decryption failure and
    /// never attempt partial rendering.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))
    }
}
