//! Input validation for publish and tier operations.
//!
//! Everything here runs before the first network call: a rejected input
//! never costs an upload or a transaction.

use bytes::Bytes;

use crate::envelope::MediaKind;
use crate::error::ValidationError;

/// Maximum media files attached to a single post.
pub const MAX_MEDIA_FILES: usize = 5;

/// Maximum subscription tiers on a profile.
pub const MAX_TIERS: usize = 3;

/// A media file staged for upload.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Bytes,
    pub kind: MediaKind,
}

/// The user-provided input to a publish operation.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub preview: String,
    pub content: String,
    pub media: Vec<MediaUpload>,
}

/// Validate a post input before any upload or transaction.
pub fn validate_post_input(input: &PostInput) -> Result<(), ValidationError> {
    if input.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if input.preview.trim().is_empty() {
        return Err(ValidationError::EmptyPreview);
    }
    if input.content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if input.media.len() > MAX_MEDIA_FILES {
        return Err(ValidationError::TooManyMediaFiles {
            got: input.media.len(),
            max: MAX_MEDIA_FILES,
        });
    }
    for (index, media) in input.media.iter().enumerate() {
        if media.bytes.is_empty() {
            return Err(ValidationError::EmptyMediaFile { index });
        }
    }
    Ok(())
}

/// Validate a subscription tier before the add-tier transaction.
pub fn validate_tier(duration_ms: u64, price: u64) -> Result<(), ValidationError> {
    if duration_ms == 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    if price == 0 {
        return Err(ValidationError::NonPositivePrice);
    }
    Ok(())
}
