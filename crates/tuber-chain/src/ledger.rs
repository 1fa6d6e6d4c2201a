//! The on-chain object model and the read seam.
//!
//! The ledger is an external collaborator: the pipeline only reads
//! eventually-consistent object contents and submits signed transactions.
//! `LedgerReader` and `TxExecutor` are the two seams; the in-memory
//! implementation in [`crate::memory`] stands in for the real chain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tuber_core::{Address, BlobId, CapId, PostId, ProfileId, SubscriptionId, TxDigest};

use crate::error::Result;
use crate::tx::SignedTransaction;

/// A paid subscription tier: a duration at a price.
///
/// Value object with no independent identity; a profile holds an ordered
/// list of at most [`tuber_core::MAX_TIERS`] of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub duration_ms: u64,
    /// Price in the chain's smallest unit.
    pub price: u64,
}

/// An on-chain creator profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    pub id: ProfileId,
    pub owner: Address,
    pub name: String,
    pub bio: String,
    pub x_handle: Option<String>,
    pub avatar_blob_id: Option<BlobId>,
    pub tiers: Vec<SubscriptionTier>,
    pub total_posts: u64,
    pub total_subscribers: u64,
    pub created_at: i64,
}

/// An on-chain post pointer. Immutable after creation.
///
/// `preview` is plaintext and public. The exclusive content lives only
/// inside the envelope referenced by `blob_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: PostId,
    pub title: String,
    pub preview: String,
    pub blob_id: BlobId,
    pub encrypted: bool,
    pub created_at: i64,
}

/// An on-chain subscription, owned by the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub profile_id: ProfileId,
    pub subscriber: Address,
    /// Wall-clock expiry, compared against chain time.
    pub expires_at: i64,
    pub created_at: i64,
}

impl Subscription {
    /// Whether this subscription entitles access at the given chain time.
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

/// A creator capability object: proof of profile ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorCap {
    pub id: CapId,
    pub profile_id: ProfileId,
}

/// Read-only, eventually-consistent view of ledger objects.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Get a profile by id.
    async fn get_profile(&self, profile_id: ProfileId) -> Result<Option<CreatorProfile>>;

    /// List all registered profiles.
    async fn list_profiles(&self) -> Result<Vec<CreatorProfile>>;

    /// Get the posts of a profile, ordered by post id.
    async fn get_posts(&self, profile_id: ProfileId) -> Result<Vec<Post>>;

    /// Get one post of a profile.
    async fn get_post(&self, profile_id: ProfileId, post_id: PostId) -> Result<Option<Post>>;

    /// List the subscriptions owned by an address.
    async fn subscriptions_of(&self, owner: Address) -> Result<Vec<Subscription>>;

    /// Get a subscription by id.
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>>;

    /// Find the creator capability owned by an address, if any.
    async fn find_creator_cap(&self, owner: Address) -> Result<Option<CreatorCap>>;

    /// The ledger's current clock reading in milliseconds.
    async fn chain_time_ms(&self) -> Result<i64>;
}

/// Executes signed transactions with ledger-guaranteed atomicity.
///
/// An aborted transaction leaves no state change.
#[async_trait]
pub trait TxExecutor: Send + Sync {
    /// Execute a signed transaction, waiting for finality.
    async fn execute(&self, tx: SignedTransaction) -> Result<TxDigest>;
}

/// Find an address's active subscription to a profile, if one exists.
///
/// An expired subscription is treated identically to no subscription.
pub fn active_subscription(
    subscriptions: &[Subscription],
    profile_id: ProfileId,
    now_ms: i64,
) -> Option<&Subscription> {
    subscriptions
        .iter()
        .find(|s| s.profile_id == profile_id && s.is_active_at(now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(profile: u8, expires_at: i64) -> Subscription {
        Subscription {
            id: SubscriptionId::from_bytes([profile; 32]),
            profile_id: ProfileId::from_bytes([profile; 32]),
            subscriber: Address::from_bytes([9; 32]),
            expires_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_active_subscription_match() {
        let subs = vec![sub(1, 100), sub(2, 100)];
        let found = active_subscription(&subs, ProfileId::from_bytes([2; 32]), 50);
        assert_eq!(found.unwrap().profile_id, ProfileId::from_bytes([2; 32]));
    }

    #[test]
    fn test_expired_subscription_is_absent() {
        let subs = vec![sub(1, 100)];
        assert!(active_subscription(&subs, ProfileId::from_bytes([1; 32]), 100).is_none());
        assert!(active_subscription(&subs, ProfileId::from_bytes([1; 32]), 101).is_none());
    }

    #[test]
    fn test_wrong_profile_is_absent() {
        let subs = vec![sub(1, 100)];
        assert!(active_subscription(&subs, ProfileId::from_bytes([3; 32]), 50).is_none());
    }
}
