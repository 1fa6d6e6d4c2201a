//! Key-server group configuration.
//!
//! The same group, threshold included, must be handed to the encryption
//! gateway at publish time and the decryption gateway at view time. Any
//! drift between the two is a silent-failure risk, so the group validates
//! itself once and both gateways share the validated value.

use serde::{Deserialize, Serialize};

use tuber_core::ObjectId;

use crate::crypto::X25519PublicKey;
use crate::error::{Result, SealError};

/// One key server: its on-chain identifier, wrap key, and voting weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyServerEntry {
    /// The server's registered object id.
    pub id: ObjectId,
    /// The key shares are wrapped to at encryption time.
    pub public_key: X25519PublicKey,
    /// How many shares this server holds. Weight 2 counts twice
    /// toward the threshold.
    pub weight: u16,
}

/// A validated key-server group with a recombination threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    pub servers: Vec<KeyServerEntry>,
    pub threshold: u16,
}

impl ServerGroup {
    /// Build a group, rejecting configurations that could never decrypt.
    pub fn new(servers: Vec<KeyServerEntry>, threshold: u16) -> Result<Self> {
        let group = Self { servers, threshold };
        group.validate()?;
        Ok(group)
    }

    /// Total share weight across all servers.
    pub fn total_weight(&self) -> u16 {
        self.servers.iter().map(|s| s.weight).sum()
    }

    /// Check threshold and weight invariants.
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(SealError::EncryptionUnavailable(
                "server group is empty".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(SealError::EncryptionUnavailable(
                "threshold must be positive".to_string(),
            ));
        }
        if self.servers.iter().any(|s| s.weight == 0) {
            return Err(SealError::EncryptionUnavailable(
                "server weight must be positive".to_string(),
            ));
        }
        let total = self.total_weight();
        if self.threshold > total {
            return Err(SealError::EncryptionUnavailable(format!(
                "threshold {} exceeds total weight {}",
                self.threshold, total
            )));
        }
        // Shamir share indexes live in GF(256) and index 0 is the secret.
        if total as usize > 255 {
            return Err(SealError::EncryptionUnavailable(format!(
                "total weight {} exceeds the 255-share limit",
                total
            )));
        }
        Ok(())
    }

    /// Assign each server its contiguous run of share indexes, in group
    /// order starting at 1. A server of weight `w` receives `w` indexes.
    pub fn share_assignments(&self) -> Vec<(ObjectId, Vec<u8>)> {
        // A u16 counter: at the full weight of 255 the last increment
        // would overflow a u8.
        let mut next = 1u16;
        self.servers
            .iter()
            .map(|server| {
                let indexes: Vec<u8> = (0..server.weight)
                    .map(|_| {
                        let idx = next as u8;
                        next += 1;
                        idx
                    })
                    .collect();
                (server.id, indexes)
            })
            .collect()
    }

    /// Look up a server's entry by id.
    pub fn entry(&self, id: ObjectId) -> Option<&KeyServerEntry> {
        self.servers.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8, weight: u16) -> KeyServerEntry {
        KeyServerEntry {
            id: ObjectId::from_bytes([byte; 32]),
            public_key: X25519PublicKey::from_bytes([byte; 32]),
            weight,
        }
    }

    #[test]
    fn valid_group_passes() {
        let group = ServerGroup::new(vec![entry(1, 1), entry(2, 1), entry(3, 1)], 2).unwrap();
        assert_eq!(group.total_weight(), 3);
    }

    #[test]
    fn threshold_above_total_weight_is_rejected() {
        assert!(ServerGroup::new(vec![entry(1, 1), entry(2, 1)], 3).is_err());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        assert!(ServerGroup::new(vec![entry(1, 1)], 0).is_err());
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(ServerGroup::new(vec![], 1).is_err());
    }

    #[test]
    fn weighted_servers_get_contiguous_indexes() {
        let group = ServerGroup::new(vec![entry(1, 2), entry(2, 1)], 2).unwrap();
        let assignments = group.share_assignments();
        assert_eq!(assignments[0].1, vec![1, 2]);
        assert_eq!(assignments[1].1, vec![3]);
    }

    #[test]
    fn full_weight_group_assigns_all_255_indexes() {
        let group = ServerGroup::new(vec![entry(1, 255)], 1).unwrap();
        let assignments = group.share_assignments();
        assert_eq!(assignments[0].1.len(), 255);
        assert_eq!(assignments[0].1.first(), Some(&1));
        assert_eq!(assignments[0].1.last(), Some(&255));
    }
}
