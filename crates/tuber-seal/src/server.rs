//! The key-server protocol.
//!
//! Each server owns a share-holding X25519 secret and answers share
//! requests entirely on its own judgment: it re-derives the policy id
//! from the approval transaction's arguments, compares it to the one the
//! ciphertext carries, verifies the session certificate, and checks the
//! viewer's subscription against the ledger. Only then does it unwrap its
//! shares and re-wrap them to the session key. No server trusts another
//! server's verdict.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tuber_chain::{parse_approval, LedgerReader};
use tuber_core::{ClockId, ObjectId, PolicyId, PolicyNonce};

use crate::crypto::WrappedShare;
use crate::error::{Result, SealError};
use crate::object::EncryptedObject;
use crate::session::SessionCertificate;

/// What a viewer submits to each key server.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// The encrypted object, as stored. Servers parse it themselves.
    pub object_bytes: Vec<u8>,
    /// The viewer's signed session certificate.
    pub certificate: SessionCertificate,
    /// Kind-only bytes of the access-check transaction.
    pub approval_tx: Vec<u8>,
}

/// A key server's share-serving interface.
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// The server's registered id, matching its group entry.
    fn id(&self) -> ObjectId;

    /// Verify a request and return this server's shares re-wrapped to
    /// the requesting session's key.
    async fn request_shares(&self, request: &ShareRequest) -> Result<Vec<WrappedShare>>;
}

pub mod memory {
    use super::*;

    use crate::crypto::X25519StaticSecret;

    /// An in-process key server verifying against an in-memory ledger.
    pub struct MemoryKeyServer {
        id: ObjectId,
        secret: X25519StaticSecret,
        ledger: Arc<dyn LedgerReader>,
        clock_id: ClockId,
        policy_nonce: PolicyNonce,
        offline: AtomicBool,
    }

    impl MemoryKeyServer {
        pub fn new(
            id: ObjectId,
            secret: X25519StaticSecret,
            ledger: Arc<dyn LedgerReader>,
            clock_id: ClockId,
            policy_nonce: PolicyNonce,
        ) -> Self {
            Self {
                id,
                secret,
                ledger,
                clock_id,
                policy_nonce,
                offline: AtomicBool::new(false),
            }
        }

        /// Take the server off the network (or bring it back).
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        async fn verify(&self, request: &ShareRequest) -> Result<EncryptedObject> {
            let object = EncryptedObject::from_bytes(&request.object_bytes)?;
            let approval = parse_approval(&request.approval_tx)
                .map_err(|e| SealError::AccessDenied(format!("bad approval: {e}")))?;

            if approval.clock_id != self.clock_id {
                return Err(SealError::AccessDenied(
                    "approval references the wrong clock".to_string(),
                ));
            }

            // Re-derive the policy id from the approval's profile argument
            // and this deployment's nonce. Both the approval's own policy
            // argument and the ciphertext must agree with it.
            let expected = PolicyId::derive(approval.profile_id, self.policy_nonce);
            if approval.policy_id != expected {
                return Err(SealError::AccessDenied(
                    "approval policy id does not match its profile".to_string(),
                ));
            }
            if object.policy_id != expected {
                return Err(SealError::AccessDenied(
                    "ciphertext policy id does not match the approval".to_string(),
                ));
            }

            let now_ms = self.ledger.chain_time_ms().await?;
            request.certificate.verify(now_ms)?;

            // Creators open their own posts without a subscription.
            let profile = self
                .ledger
                .get_profile(approval.profile_id)
                .await?
                .ok_or_else(|| SealError::AccessDenied("no such profile".to_string()))?;
            if profile.owner == request.certificate.address {
                return Ok(object);
            }

            let subscription = self
                .ledger
                .get_subscription(approval.subscription_id)
                .await?
                .ok_or_else(|| SealError::AccessDenied("no such subscription".to_string()))?;
            if subscription.profile_id != approval.profile_id {
                return Err(SealError::AccessDenied(
                    "subscription is for a different profile".to_string(),
                ));
            }
            if subscription.subscriber != request.certificate.address {
                return Err(SealError::AccessDenied(
                    "subscription belongs to someone else".to_string(),
                ));
            }
            if !subscription.is_active_at(now_ms) {
                return Err(SealError::AccessDenied("subscription expired".to_string()));
            }

            Ok(object)
        }
    }

    #[async_trait]
    impl KeyServer for MemoryKeyServer {
        fn id(&self) -> ObjectId {
            self.id
        }

        async fn request_shares(&self, request: &ShareRequest) -> Result<Vec<WrappedShare>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(SealError::ServerUnreachable("server offline".to_string()));
            }

            let object = self.verify(request).await?;

            let held = object.shares_for(self.id).ok_or_else(|| {
                SealError::AccessDenied("this server holds no shares for the object".to_string())
            })?;

            let mut rewrapped = Vec::with_capacity(held.shares.len());
            for wrapped in &held.shares {
                let share = wrapped.open(&object.policy_id, &self.secret)?;
                rewrapped.push(WrappedShare::create(
                    &share,
                    &object.policy_id,
                    &request.certificate.session_public,
                )?);
            }

            debug!(
                server = %self.id,
                shares = rewrapped.len(),
                "share request approved"
            );
            Ok(rewrapped)
        }
    }
}
