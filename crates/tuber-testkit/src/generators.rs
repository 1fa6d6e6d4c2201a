//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use tuber_chain::Keypair;
use tuber_core::{
    Address, BlobId, MediaKind, MediaRef, ObjectId, PolicyNonce, PostEnvelope, PostInput,
    ProfileId, MAX_MEDIA_FILES,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random ObjectId.
pub fn object_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 32]>().prop_map(ObjectId::from_bytes)
}

/// Generate a random ProfileId.
pub fn profile_id() -> impl Strategy<Value = ProfileId> {
    any::<[u8; 32]>().prop_map(ProfileId::from_bytes)
}

/// Generate a random Address.
pub fn address() -> impl Strategy<Value = Address> {
    keypair().prop_map(|kp| kp.address())
}

/// Generate a random policy nonce, zero included.
pub fn policy_nonce() -> impl Strategy<Value = PolicyNonce> {
    any::<[u8; 8]>().prop_map(PolicyNonce::from_bytes)
}

/// Generate a media kind.
pub fn media_kind() -> impl Strategy<Value = MediaKind> {
    prop_oneof![Just(MediaKind::Image), Just(MediaKind::Video)]
}

/// Generate a media reference with a short hex blob id.
pub fn media_ref() -> impl Strategy<Value = MediaRef> {
    (any::<[u8; 16]>(), media_kind()).prop_map(|(id, kind)| MediaRef {
        blob_id: BlobId::new(hex::encode(id)),
        kind,
    })
}

/// Generate a decodable post envelope.
pub fn envelope() -> impl Strategy<Value = PostEnvelope> {
    (
        "[a-zA-Z0-9 ]{1,40}",
        "[a-zA-Z0-9 ]{1,80}",
        "[a-zA-Z0-9 \\n]{1,400}",
        proptest::collection::vec(media_ref(), 0..MAX_MEDIA_FILES),
    )
        .prop_map(|(title, preview, content, media_files)| PostEnvelope {
            title,
            preview,
            content,
            media_files,
        })
}

/// Generate a post input that passes validation.
///
/// Text fields start with a non-space so trimming never empties them.
pub fn valid_post_input() -> impl Strategy<Value = PostInput> {
    (
        "[a-zA-Z0-9][a-zA-Z0-9 ]{0,39}",
        "[a-zA-Z0-9][a-zA-Z0-9 ]{0,79}",
        "[a-zA-Z0-9][a-zA-Z0-9 \\n]{0,399}",
        proptest::collection::vec(
            (proptest::collection::vec(any::<u8>(), 1..64), media_kind()),
            0..MAX_MEDIA_FILES,
        ),
    )
        .prop_map(|(title, preview, content, media)| PostInput {
            title,
            preview,
            content,
            media: media
                .into_iter()
                .map(|(bytes, kind)| tuber_core::MediaUpload {
                    bytes: Bytes::from(bytes),
                    kind,
                })
                .collect(),
        })
}
