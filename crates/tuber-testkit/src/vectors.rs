//! Golden vectors for the envelope wire format.
//!
//! The envelope is the one hand-authored wire format in the system, and
//! both sides of the encrypt boundary must agree on it byte for byte.
//! These vectors pin the exact JSON so an accidental field rename or
//! reordering shows up as a test failure, not a fleet of undecryptable
//! posts.

use tuber_core::{BlobId, MediaKind, MediaRef, PostEnvelope};

/// One golden envelope with its exact serialized form.
pub struct GoldenVector {
    pub name: &'static str,
    pub envelope: PostEnvelope,
    pub json: &'static str,
}

/// All golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "text-only",
            envelope: PostEnvelope {
                title: "hello".to_string(),
                preview: "a preview".to_string(),
                content: "the content".to_string(),
                media_files: vec![],
            },
            json: r#"{"title":"hello","preview":"a preview","content":"the content","mediaFiles":[]}"#,
        },
        GoldenVector {
            name: "with-media",
            envelope: PostEnvelope {
                title: "t".to_string(),
                preview: "p".to_string(),
                content: "c".to_string(),
                media_files: vec![
                    MediaRef {
                        blob_id: BlobId::new("blob-1"),
                        kind: MediaKind::Image,
                    },
                    MediaRef {
                        blob_id: BlobId::new("blob-2"),
                        kind: MediaKind::Video,
                    },
                ],
            },
            json: r#"{"title":"t","preview":"p","content":"c","mediaFiles":[{"blobId":"blob-1","type":"image"},{"blobId":"blob-2","type":"video"}]}"#,
        },
        GoldenVector {
            name: "unicode",
            envelope: PostEnvelope {
                title: "café ☕".to_string(),
                preview: "naïve".to_string(),
                content: "日本語".to_string(),
                media_files: vec![],
            },
            json: "{\"title\":\"café ☕\",\"preview\":\"naïve\",\"content\":\"日本語\",\"mediaFiles\":[]}",
        },
    ]
}

/// Check every vector encodes to its pinned bytes and decodes back.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let encoded = vector
            .envelope
            .encode()
            .map_err(|e| format!("{}: encode failed: {e}", vector.name))?;
        if encoded != vector.json.as_bytes() {
            return Err(format!(
                "{}: encoded JSON drifted from golden form",
                vector.name
            ));
        }
        let decoded = PostEnvelope::decode(vector.json.as_bytes())
            .map_err(|e| format!("{}: decode failed: {e}", vector.name))?;
        if decoded != vector.envelope {
            return Err(format!("{}: decode did not roundtrip", vector.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_vectors_hold() {
        verify_all_vectors().unwrap();
    }
}
