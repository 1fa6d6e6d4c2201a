//! Policy identifier derivation.
//!
//! Every encrypted post under a profile is keyed to a policy identifier:
//! the profile's fixed-width object id followed by a fixed-length nonce.
//! The same derivation runs at encrypt time and inside each key server at
//! decrypt time; any byte difference makes the two sides disagree and the
//! decryption request is denied.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ProfileId;

/// A fixed-length deployment nonce appended to the profile id.
///
/// This is deployment configuration, not a per-post value. The default is
/// zero-filled, which means all posts under a profile share one policy id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyNonce(pub [u8; 8]);

impl PolicyNonce {
    /// The zero nonce used by default deployments.
    pub const ZERO: Self = Self([0u8; 8]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Default for PolicyNonce {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A derived policy identifier: profile id bytes followed by the nonce.
///
/// Never stored independently; derived on demand on both sides of the
/// encrypt/decrypt boundary. Derivation is pure: no I/O, no randomness.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId {
    profile: [u8; 32],
    nonce: [u8; 8],
}

impl PolicyId {
    /// Length of the serialized policy id in bytes.
    pub const LEN: usize = 40;

    /// Derive the policy id for a profile under a deployment nonce.
    pub fn derive(profile_id: ProfileId, nonce: PolicyNonce) -> Self {
        Self {
            profile: *profile_id.as_bytes(),
            nonce: nonce.0,
        }
    }

    /// The concatenated byte form: `profile_id ++ nonce`.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..32].copy_from_slice(&self.profile);
        out[32..].copy_from_slice(&self.nonce);
        out
    }

    /// Parse back from the concatenated byte form.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut profile = [0u8; 32];
        let mut nonce = [0u8; 8];
        profile.copy_from_slice(&bytes[..32]);
        nonce.copy_from_slice(&bytes[32..]);
        Some(Self { profile, nonce })
    }

    /// The profile component.
    pub fn profile_id(&self) -> ProfileId {
        ProfileId::from_bytes(self.profile)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl fmt::Debug for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolicyId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derivation_deterministic() {
        let profile = ProfileId::from_bytes([0x11; 32]);
        let a = PolicyId::derive(profile, PolicyNonce::ZERO);
        let b = PolicyId::derive(profile, PolicyNonce::ZERO);
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_distinct_profiles_distinct_ids() {
        let a = PolicyId::derive(ProfileId::from_bytes([0x01; 32]), PolicyNonce::ZERO);
        let b = PolicyId::derive(ProfileId::from_bytes([0x02; 32]), PolicyNonce::ZERO);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_nonce_changes_id() {
        let profile = ProfileId::from_bytes([0x11; 32]);
        let a = PolicyId::derive(profile, PolicyNonce::ZERO);
        let b = PolicyId::derive(profile, PolicyNonce::from_bytes([1, 0, 0, 0, 0, 0, 0, 0]));
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_byte_roundtrip() {
        let id = PolicyId::derive(ProfileId::from_bytes([0x42; 32]), PolicyNonce::ZERO);
        let recovered = PolicyId::from_bytes(&id.to_bytes()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_layout_is_profile_then_nonce() {
        let id = PolicyId::derive(ProfileId::from_bytes([0xaa; 32]), PolicyNonce::ZERO);
        let bytes = id.to_bytes();
        assert_eq!(&bytes[..32], &[0xaa; 32]);
        assert_eq!(&bytes[32..], &[0u8; 8]);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert!(PolicyId::from_bytes(&[0u8; 39]).is_none());
        assert!(PolicyId::from_bytes(&[0u8; 41]).is_none());
    }

    proptest! {
        #[test]
        fn prop_derivation_deterministic(
            profile in any::<[u8; 32]>(),
            nonce in any::<[u8; 8]>(),
        ) {
            let profile = ProfileId::from_bytes(profile);
            let nonce = PolicyNonce::from_bytes(nonce);
            let a = PolicyId::derive(profile, nonce);
            let b = PolicyId::derive(profile, nonce);
            prop_assert_eq!(a.to_bytes(), b.to_bytes());
        }

        #[test]
        fn prop_byte_roundtrip_recovers_profile(
            profile in any::<[u8; 32]>(),
            nonce in any::<[u8; 8]>(),
        ) {
            let id = PolicyId::derive(ProfileId::from_bytes(profile), PolicyNonce::from_bytes(nonce));
            let recovered = PolicyId::from_bytes(&id.to_bytes());
            prop_assert_eq!(recovered, Some(id));
            prop_assert_eq!(id.profile_id(), ProfileId::from_bytes(profile));
        }
    }
}
