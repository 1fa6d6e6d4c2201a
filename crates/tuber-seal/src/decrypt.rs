//! The decryption gateway.
//!
//! Collects re-wrapped shares from the key-server group, combining them
//! the moment the threshold weight is reached. Failure classification
//! matters as much as success here: a server that said no produces
//! "access denied", while servers that could not be reached produce
//! "threshold service unreachable". The two lead users to very different
//! next steps.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::crypto::ContentKey;
use crate::error::{Result, SealError};
use crate::group::ServerGroup;
use crate::object::EncryptedObject;
use crate::server::{KeyServer, ShareRequest};
use crate::session::SessionKey;
use crate::shamir::{self, Share};

/// Unseal an encrypted object through a key-server group.
///
/// `session` must be signed; `approval_tx` is the kind-only access-check
/// transaction from the approval builder. Servers are queried in group
/// order and querying stops as soon as enough share weight has arrived.
pub async fn seal_decrypt(
    object_bytes: &[u8],
    session: &SessionKey,
    approval_tx: &[u8],
    group: &ServerGroup,
    servers: &[Arc<dyn KeyServer>],
    now_ms: i64,
) -> Result<Vec<u8>> {
    let object = EncryptedObject::from_bytes(object_bytes)?;
    group.validate()?;

    // The group handed in at view time must be the group the object was
    // sealed for; drift would otherwise fail in confusing ways later.
    if object.threshold != group.threshold {
        return Err(SealError::MalformedObject(format!(
            "object threshold {} does not match group threshold {}",
            object.threshold, group.threshold
        )));
    }
    for held in &object.shares {
        if group.entry(held.server_id).is_none() {
            return Err(SealError::MalformedObject(
                "object was sealed for a different server group".to_string(),
            ));
        }
    }

    let certificate = session.certificate(now_ms)?;
    let request = ShareRequest {
        object_bytes: object_bytes.to_vec(),
        certificate,
        approval_tx: approval_tx.to_vec(),
    };

    let mut shares: Vec<Share> = Vec::new();
    let mut denied: Option<String> = None;

    for held in &object.shares {
        if (shares.len() as u16) >= object.threshold {
            break;
        }

        let Some(server) = servers.iter().find(|s| s.id() == held.server_id) else {
            warn!(server = %held.server_id, "no client for group server");
            continue;
        };

        match server.request_shares(&request).await {
            Ok(rewrapped) => {
                for wrapped in rewrapped {
                    let share = wrapped.open(&object.policy_id, session.secret())?;
                    if shares.iter().all(|s| s.index != share.index) {
                        shares.push(share);
                    }
                }
            }
            Err(SealError::AccessDenied(reason)) => {
                debug!(server = %held.server_id, %reason, "share request denied");
                denied.get_or_insert(reason);
            }
            Err(SealError::SessionExpired) => return Err(SealError::SessionExpired),
            Err(err) => {
                warn!(server = %held.server_id, %err, "key server unreachable");
            }
        }
    }

    let have = shares.len() as u16;
    if have < object.threshold {
        return match denied {
            Some(reason) => Err(SealError::AccessDenied(reason)),
            None => Err(SealError::ThresholdUnavailable {
                have,
                need: object.threshold,
            }),
        };
    }

    shares.truncate(object.threshold as usize);
    let key_bytes = shamir::combine(&shares, 32)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&key_bytes);

    ContentKey::from_bytes(key).decrypt(&object.ciphertext, &object.nonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tuber_chain::{
        ApprovalBuilder, ApprovalStrategy, CallTargets, Keypair, LedgerReader, LocalWallet,
        MemoryLedger, Wallet,
    };
    use tuber_core::{ObjectId, PolicyId, PolicyNonce, ProfileId, SubscriptionId};

    use crate::crypto::X25519StaticSecret;
    use crate::encrypt::seal_encrypt;
    use crate::group::KeyServerEntry;
    use crate::server::memory::MemoryKeyServer;

    const PACKAGE: ObjectId = ObjectId::from_bytes([0xaa; 32]);
    const TIER_PRICE: u64 = 1_000;

    struct Scenario {
        ledger: Arc<MemoryLedger>,
        group: ServerGroup,
        servers: Vec<Arc<MemoryKeyServer>>,
        profile_id: ProfileId,
        subscription_id: SubscriptionId,
        policy_id: PolicyId,
        viewer: Arc<LocalWallet>,
    }

    /// Stand up a ledger with one creator, one paid subscriber, and a
    /// three-server group at threshold two.
    async fn scenario() -> Scenario {
        let ledger = Arc::new(MemoryLedger::new());
        let targets = CallTargets::for_package(PACKAGE);

        let creator = Arc::new(LocalWallet::new(Keypair::generate(), ledger.clone()));
        let writer = tuber_chain::writer::ChainWriter::new(
            ledger.clone(),
            creator.clone(),
            targets.clone(),
            ledger.clock_id(),
        );
        writer.register("alice", "bio", TIER_PRICE).await.unwrap();
        let profile_id = ledger.list_profiles().await.unwrap()[0].id;

        let viewer = Arc::new(LocalWallet::new(Keypair::generate(), ledger.clone()));
        let viewer_writer = tuber_chain::writer::ChainWriter::new(
            ledger.clone(),
            viewer.clone(),
            targets.clone(),
            ledger.clock_id(),
        );
        viewer_writer.subscribe(profile_id, TIER_PRICE).await.unwrap();
        let subscription_id = ledger
            .subscriptions_of(viewer.address())
            .await
            .unwrap()[0]
            .id;

        let secrets: Vec<X25519StaticSecret> =
            (0..3).map(|_| X25519StaticSecret::generate()).collect();
        let entries: Vec<KeyServerEntry> = secrets
            .iter()
            .enumerate()
            .map(|(i, secret)| KeyServerEntry {
                id: ObjectId::from_bytes([0x50 + i as u8; 32]),
                public_key: secret.public_key(),
                weight: 1,
            })
            .collect();
        let group = ServerGroup::new(entries.clone(), 2).unwrap();

        let servers: Vec<Arc<MemoryKeyServer>> = secrets
            .into_iter()
            .zip(entries)
            .map(|(secret, entry)| {
                Arc::new(MemoryKeyServer::new(
                    entry.id,
                    secret,
                    ledger.clone() as Arc<dyn LedgerReader>,
                    ledger.clock_id(),
                    PolicyNonce::ZERO,
                ))
            })
            .collect();

        let policy_id = PolicyId::derive(profile_id, PolicyNonce::ZERO);

        Scenario {
            ledger,
            group,
            servers,
            profile_id,
            subscription_id,
            policy_id,
            viewer,
        }
    }

    fn as_dyn(servers: &[Arc<MemoryKeyServer>]) -> Vec<Arc<dyn KeyServer>> {
        servers
            .iter()
            .map(|s| s.clone() as Arc<dyn KeyServer>)
            .collect()
    }

    async fn signed_session(s: &Scenario) -> SessionKey {
        let now_ms = s.ledger.chain_time_ms().await.unwrap();
        let mut session = SessionKey::create(s.viewer.address(), PACKAGE, 10, now_ms);
        let signature = s
            .viewer
            .sign_personal_message(&session.personal_message())
            .await
            .unwrap();
        session.set_signature(signature);
        session
    }

    async fn approval_for(s: &Scenario, policy_id: PolicyId) -> Vec<u8> {
        let builder = ApprovalBuilder::new(
            CallTargets::for_package(PACKAGE),
            s.ledger.clock_id(),
            ApprovalStrategy::BuildOnly,
        );
        let wallet: Arc<dyn Wallet> = s.viewer.clone();
        builder
            .build(&wallet, policy_id, s.subscription_id, s.profile_id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn subscriber_decrypts_sealed_payload() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"subscriber-only post", s.policy_id, &s.group).unwrap();

        let session = signed_session(&s).await;
        let approval = approval_for(&s, s.policy_id).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let plaintext = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap();
        assert_eq!(plaintext, b"subscriber-only post");
    }

    #[tokio::test]
    async fn decrypts_with_one_server_offline() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"resilient", s.policy_id, &s.group).unwrap();
        s.servers[0].set_offline(true);

        let session = signed_session(&s).await;
        let approval = approval_for(&s, s.policy_id).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let plaintext = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap();
        assert_eq!(plaintext, b"resilient");
    }

    #[tokio::test]
    async fn two_servers_offline_is_threshold_unavailable() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"x", s.policy_id, &s.group).unwrap();
        s.servers[0].set_offline(true);
        s.servers[1].set_offline(true);

        let session = signed_session(&s).await;
        let approval = approval_for(&s, s.policy_id).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let err = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SealError::ThresholdUnavailable { have: 1, need: 2 }
        ));
    }

    #[tokio::test]
    async fn nonce_drift_is_access_denied() {
        let s = scenario().await;
        // Sealed under a different deployment nonce than the servers use.
        let drifted = PolicyId::derive(s.profile_id, PolicyNonce::from_bytes([1; 8]));
        let sealed = seal_encrypt(b"x", drifted, &s.group).unwrap();

        let session = signed_session(&s).await;
        let approval = approval_for(&s, drifted).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let err = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SealError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn expired_subscription_is_access_denied() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"x", s.policy_id, &s.group).unwrap();

        // Advance past the one-year default tier duration.
        s.ledger
            .advance_clock(tuber_chain::DEFAULT_TIER_DURATION_MS as i64 + 1);

        let session = signed_session(&s).await;
        let approval = approval_for(&s, s.policy_id).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let err = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SealError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn unsigned_session_aborts_before_any_server_call() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"x", s.policy_id, &s.group).unwrap();
        let now_ms = s.ledger.chain_time_ms().await.unwrap();
        let session = SessionKey::create(s.viewer.address(), PACKAGE, 10, now_ms);
        let approval = approval_for(&s, s.policy_id).await;

        let err = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &s.group,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SealError::AuthorizationDeclined));
    }

    #[tokio::test]
    async fn mismatched_group_is_rejected_up_front() {
        let s = scenario().await;
        let sealed = seal_encrypt(b"x", s.policy_id, &s.group).unwrap();

        let mut narrower = s.group.clone();
        narrower.threshold = 1;

        let session = signed_session(&s).await;
        let approval = approval_for(&s, s.policy_id).await;
        let now_ms = s.ledger.chain_time_ms().await.unwrap();

        let err = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &narrower,
            &as_dyn(&s.servers),
            now_ms,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SealError::MalformedObject(_)));
    }
}
