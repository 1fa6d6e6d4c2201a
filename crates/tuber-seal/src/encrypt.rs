//! The encryption gateway.
//!
//! Sealing is local: a fresh content key encrypts the payload, the key is
//! split into Shamir shares, and each share is wrapped to its holding
//! server's public key. No plaintext or key material leaves this function;
//! the servers only become involved at decrypt time.

use tracing::debug;

use tuber_core::PolicyId;

use crate::crypto::{ContentKey, SealNonce, WrappedShare};
use crate::error::{Result, SealError};
use crate::group::ServerGroup;
use crate::object::{EncryptedObject, ServerShares, OBJECT_VERSION};
use crate::shamir;

/// Seal plaintext under a policy for a key-server group.
///
/// The returned bytes are self-describing; the same group (threshold
/// included) must later be offered to the decryption gateway.
pub fn seal_encrypt(
    plaintext: &[u8],
    policy_id: PolicyId,
    group: &ServerGroup,
) -> Result<Vec<u8>> {
    group.validate()?;

    let content_key = ContentKey::generate();
    let nonce = SealNonce::generate();
    let ciphertext = content_key.encrypt(plaintext, &nonce)?;

    let assignments = group.share_assignments();
    let all_indexes: Vec<u8> = assignments
        .iter()
        .flat_map(|(_, indexes)| indexes.iter().copied())
        .collect();

    let shares = shamir::split(
        content_key.as_bytes(),
        group.threshold.min(255) as u8,
        &all_indexes,
    )?;

    let mut by_index = shares
        .into_iter()
        .map(|share| (share.index, share))
        .collect::<std::collections::HashMap<_, _>>();

    let mut server_shares = Vec::with_capacity(assignments.len());
    for (server_id, indexes) in assignments {
        let entry = group.entry(server_id).ok_or_else(|| {
            SealError::EncryptionUnavailable("server missing from its own group".to_string())
        })?;
        let mut wrapped = Vec::with_capacity(indexes.len());
        for index in indexes {
            let share = by_index.remove(&index).ok_or_else(|| {
                SealError::EncryptionUnavailable("share index missing after split".to_string())
            })?;
            wrapped.push(WrappedShare::create(&share, &policy_id, &entry.public_key)?);
        }
        server_shares.push(ServerShares {
            server_id,
            shares: wrapped,
        });
    }

    debug!(
        policy = %policy_id,
        servers = server_shares.len(),
        threshold = group.threshold,
        "payload sealed"
    );

    let object = EncryptedObject {
        version: OBJECT_VERSION,
        policy_id,
        threshold: group.threshold,
        shares: server_shares,
        nonce,
        ciphertext,
    };
    object.to_bytes()
}
