//! The self-describing encrypted object.
//!
//! Everything the decryption gateway needs to verify a request is inside
//! the bytes themselves: the policy id, the threshold, and which server
//! holds which wrapped shares. Nothing is communicated out of band.

use serde::{Deserialize, Serialize};

use tuber_core::{ObjectId, PolicyId};

use crate::crypto::{SealNonce, WrappedShare};
use crate::error::{Result, SealError};

/// Current encoding version.
pub const OBJECT_VERSION: u8 = 1;

/// One server's wrapped shares inside an encrypted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerShares {
    /// The holding server's id.
    pub server_id: ObjectId,
    /// That server's wrapped shares, one per weight unit.
    pub shares: Vec<WrappedShare>,
}

/// A threshold-encrypted payload with embedded access metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    /// Encoding version, for forward migration.
    pub version: u8,

    /// The policy this payload is sealed under.
    pub policy_id: PolicyId,

    /// Share weight required to recombine the content key.
    pub threshold: u16,

    /// Wrapped content-key shares, grouped by holding server.
    pub shares: Vec<ServerShares>,

    /// Nonce for the payload cipher.
    pub nonce: SealNonce,

    /// The ChaCha20-Poly1305 payload.
    pub ciphertext: Vec<u8>,
}

impl EncryptedObject {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SealError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes, checking the version and basic shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let object: Self = ciborium::from_reader(bytes)
            .map_err(|e| SealError::MalformedObject(e.to_string()))?;
        if object.version != OBJECT_VERSION {
            return Err(SealError::MalformedObject(format!(
                "unsupported version {}",
                object.version
            )));
        }
        if object.threshold == 0 {
            return Err(SealError::MalformedObject(
                "zero threshold".to_string(),
            ));
        }
        if object.shares.is_empty() {
            return Err(SealError::MalformedObject("no shares".to_string()));
        }
        Ok(object)
    }

    /// The wrapped shares held by one server, if it holds any.
    pub fn shares_for(&self, server_id: ObjectId) -> Option<&ServerShares> {
        self.shares.iter().find(|s| s.server_id == server_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tuber_core::{PolicyNonce, ProfileId};

    use crate::crypto::X25519PublicKey;

    fn sample_object() -> EncryptedObject {
        EncryptedObject {
            version: OBJECT_VERSION,
            policy_id: PolicyId::derive(ProfileId::from_bytes([1; 32]), PolicyNonce::ZERO),
            threshold: 2,
            shares: vec![ServerShares {
                server_id: ObjectId::from_bytes([2; 32]),
                shares: vec![WrappedShare {
                    share_index: 1,
                    ephemeral_public: X25519PublicKey::from_bytes([3; 32]),
                    nonce: SealNonce([4; 12]),
                    ciphertext: vec![5, 6, 7],
                }],
            }],
            nonce: SealNonce([8; 12]),
            ciphertext: vec![9, 10],
        }
    }

    #[test]
    fn cbor_roundtrip() {
        let object = sample_object();
        let bytes = object.to_bytes().unwrap();
        let recovered = EncryptedObject::from_bytes(&bytes).unwrap();
        assert_eq!(object, recovered);
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut object = sample_object();
        object.version = 9;
        let bytes = object.to_bytes().unwrap();
        assert!(matches!(
            EncryptedObject::from_bytes(&bytes),
            Err(SealError::MalformedObject(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        assert!(matches!(
            EncryptedObject::from_bytes(b"not cbor at all"),
            Err(SealError::MalformedObject(_))
        ));
    }
}
