//! The view pipeline.
//!
//! Viewing an encrypted post starts with the cheapest check and works
//! outward: the paywall gate consults only ledger reads, so a viewer
//! without an active subscription costs zero session signatures and zero
//! key-server calls. Only an entitled viewer proceeds to download,
//! approval, session signing, and threshold decryption.
//!
//! Decrypt attempts are slot-scoped: a [`ViewSlot`] carries a generation
//! counter, and a result is applied only if its attempt is still the
//! current one. A slow first attempt can never overwrite the outcome of
//! a fast second attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, instrument};

use tuber_chain::{
    active_subscription, ApprovalBuilder, ChainError, LedgerReader, Post, Wallet,
};
use tuber_core::{BlobId, MediaKind, PolicyId, PostEnvelope, PostId, ProfileId, SubscriptionId};
use tuber_seal::{seal_decrypt, KeyServer, SealError, SessionKey};
use tuber_store::BlobStore;

use crate::config::DeploymentConfig;
use crate::error::{Result, TuberError};

/// A displayable media reference: the retrieval URL and its kind.
///
/// URLs from a slot-scoped view are dropped with the slot; they are not
/// shared across viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub url: String,
    pub kind: MediaKind,
}

/// A fully resolved post, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewedPost {
    pub title: String,
    pub preview: String,
    pub content: String,
    pub media: Vec<MediaHandle>,
}

/// The outcome of a view attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// No active subscription; only the on-chain preview is available.
    Paywall,
    /// The envelope was recovered and resolved.
    Unlocked(ViewedPost),
}

/// Why a decrypt attempt failed, in user-distinguishable buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A key server verified the request and refused it.
    Denied(String),
    /// Too few key servers were reachable.
    Unreachable,
    /// The wallet declined to sign.
    Declined,
    /// Anything else: storage, malformed data, chain reads.
    Other(String),
}

impl FailureReason {
    fn classify(err: &TuberError) -> Self {
        match err {
            TuberError::Seal(SealError::AccessDenied(reason)) => Self::Denied(reason.clone()),
            TuberError::Seal(SealError::ThresholdUnavailable { .. }) => Self::Unreachable,
            TuberError::Seal(SealError::AuthorizationDeclined)
            | TuberError::Chain(ChainError::AuthorizationDeclined) => Self::Declined,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Decrypt lifecycle of one displayed post.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    NoAttempt,
    Decrypting,
    Paywall,
    Decrypted(ViewedPost),
    Failed(FailureReason),
}

/// A cancellation-aware holder for one post's view state.
///
/// `begin` hands out a generation token; `complete` applies a result
/// only while its token is still current. Re-keying the slot (the viewer
/// navigated, the subscription changed) means calling `begin` again,
/// which invalidates every in-flight attempt at once.
pub struct ViewSlot {
    generation: AtomicU64,
    state: RwLock<ViewState>,
}

impl ViewSlot {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: RwLock::new(ViewState::NoAttempt),
        }
    }

    /// Start a new attempt, invalidating any in-flight one.
    pub fn begin(&self) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write().unwrap() = ViewState::Decrypting;
        token
    }

    /// Apply an outcome if `token` is still the current attempt.
    ///
    /// Returns whether the outcome was applied; a stale result is
    /// discarded without touching the state.
    pub fn complete(&self, token: u64, outcome: std::result::Result<ViewOutcome, &TuberError>) -> bool {
        if self.generation.load(Ordering::SeqCst) != token {
            debug!(token, "stale view result discarded");
            return false;
        }
        let state = match outcome {
            Ok(ViewOutcome::Paywall) => ViewState::Paywall,
            Ok(ViewOutcome::Unlocked(post)) => ViewState::Decrypted(post),
            Err(err) => ViewState::Failed(FailureReason::classify(err)),
        };
        *self.state.write().unwrap() = state;
        true
    }

    /// Drop back to no attempt, releasing any held media handles.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().unwrap() = ViewState::NoAttempt;
    }

    /// The current state.
    pub fn state(&self) -> ViewState {
        self.state.read().unwrap().clone()
    }
}

impl Default for ViewSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The viewer-side pipeline.
pub struct Viewer {
    reader: Arc<dyn LedgerReader>,
    wallet: Arc<dyn Wallet>,
    store: Arc<dyn BlobStore>,
    servers: Vec<Arc<dyn KeyServer>>,
    config: DeploymentConfig,
}

impl Viewer {
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        wallet: Arc<dyn Wallet>,
        store: Arc<dyn BlobStore>,
        servers: Vec<Arc<dyn KeyServer>>,
        config: DeploymentConfig,
    ) -> Self {
        Self {
            reader,
            wallet,
            store,
            servers,
            config,
        }
    }

    /// View one post, gating on the paywall before any expensive step.
    #[instrument(skip(self), fields(profile = %profile_id, post = %post_id))]
    pub async fn view_post(&self, profile_id: ProfileId, post_id: PostId) -> Result<ViewOutcome> {
        let post = self
            .reader
            .get_post(profile_id, post_id)
            .await?
            .ok_or_else(|| TuberError::PostNotFound {
                profile: profile_id.to_string(),
                post: post_id.0,
            })?;

        if !post.encrypted {
            let viewed = self.resolve_public(&post).await?;
            return Ok(ViewOutcome::Unlocked(viewed));
        }

        // Paywall gate. Ledger reads only; no session, no server calls.
        // Creators pass on ownership alone; their approval carries the
        // profile id in the subscription slot, which the access check
        // never inspects on the owner path.
        let now_ms = self.reader.chain_time_ms().await?;
        let profile = self.reader.get_profile(profile_id).await?;
        let is_owner = profile.is_some_and(|p| p.owner == self.wallet.address());
        let subscription_id = if is_owner {
            SubscriptionId(profile_id.object_id())
        } else {
            let subscriptions = self.reader.subscriptions_of(self.wallet.address()).await?;
            let Some(subscription) = active_subscription(&subscriptions, profile_id, now_ms)
            else {
                debug!("no active subscription, paywall shown");
                return Ok(ViewOutcome::Paywall);
            };
            subscription.id
        };

        let sealed = self.store.download(&post.blob_id).await?;

        let policy_id = PolicyId::derive(profile_id, self.config.policy_nonce);
        let approval = ApprovalBuilder::new(
            self.config.call_targets(),
            self.config.clock_id,
            self.config.approval_strategy,
        )
        .build(&self.wallet, policy_id, subscription_id, profile_id)
        .await?;

        let mut session = SessionKey::create(
            self.wallet.address(),
            self.config.package_id,
            self.config.session_ttl_min,
            now_ms,
        );
        // A declined signature is a user decision; any other wallet
        // failure keeps its own error.
        let signature = self
            .wallet
            .sign_personal_message(&session.personal_message())
            .await
            .map_err(|e| match e {
                ChainError::AuthorizationDeclined => {
                    TuberError::from(SealError::AuthorizationDeclined)
                }
                other => TuberError::from(other),
            })?;
        session.set_signature(signature);

        let plaintext = seal_decrypt(
            &sealed,
            &session,
            &approval,
            &self.config.server_group,
            &self.servers,
            now_ms,
        )
        .await?;

        // A malformed envelope after successful recombination is treated
        // exactly like a decryption failure; nothing partial is rendered.
        let envelope = PostEnvelope::decode(&plaintext)?;
        let viewed = self.resolve_envelope(envelope);
        info!("post unlocked");
        Ok(ViewOutcome::Unlocked(viewed))
    }

    /// Run a view attempt against a slot, discarding the result if a
    /// newer attempt superseded it mid-flight.
    pub async fn view_into(
        &self,
        slot: &ViewSlot,
        profile_id: ProfileId,
        post_id: PostId,
    ) -> bool {
        let token = slot.begin();
        match self.view_post(profile_id, post_id).await {
            Ok(outcome) => slot.complete(token, Ok(outcome)),
            Err(err) => slot.complete(token, Err(&err)),
        }
    }

    async fn resolve_public(&self, post: &Post) -> Result<ViewedPost> {
        let bytes = self.store.download(&post.blob_id).await?;
        let envelope = PostEnvelope::decode(&bytes)?;
        Ok(self.resolve_envelope(envelope))
    }

    fn resolve_envelope(&self, envelope: PostEnvelope) -> ViewedPost {
        let media = envelope
            .media_files
            .iter()
            .map(|m| MediaHandle {
                url: self.media_url(&m.blob_id),
                kind: m.kind,
            })
            .collect();
        ViewedPost {
            title: envelope.title,
            preview: envelope.preview,
            content: envelope.content,
            media,
        }
    }

    fn media_url(&self, blob_id: &BlobId) -> String {
        self.store.url_for(blob_id)
    }
}
