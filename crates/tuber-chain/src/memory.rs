//! In-memory ledger implementation.
//!
//! Primarily for tests. Execution is atomic: every call in a transaction
//! is applied to a scratch copy of the state, which replaces the real
//! state only if the whole transaction succeeds. An aborted transaction
//! therefore leaves no state change, matching the ledger guarantee the
//! pipeline relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use tuber_core::{
    validate_tier, Address, BlobId, CapId, ClockId, ObjectId, PolicyId, PostId, ProfileId,
    SubscriptionId, TxDigest, MAX_TIERS,
};

use crate::error::{ChainError, Result};
use crate::ledger::{
    CreatorCap, CreatorProfile, LedgerReader, Post, Subscription, SubscriptionTier, TxExecutor,
};
use crate::tx::{MoveCall, SignedTransaction};

/// The well-known shared clock object id.
pub const CLOCK_OBJECT_ID: ObjectId = ObjectId([0x06; 32]);

/// Duration of the default tier created at registration: one year.
pub const DEFAULT_TIER_DURATION_MS: u64 = 31_536_000_000;

/// In-memory ledger. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
}

#[derive(Clone)]
struct LedgerInner {
    profiles: HashMap<ProfileId, CreatorProfile>,
    /// Posts keyed under their profile, ordered by post id.
    posts: HashMap<ProfileId, BTreeMap<u64, Post>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    /// One creator capability per address.
    caps: HashMap<Address, CreatorCap>,
    /// Creator earnings from subscribe payments, smallest unit.
    balances: HashMap<Address, u64>,
    /// Blob registrations for the chain-coupled storage flow.
    blobs: HashMap<String, BlobRecord>,
    clock_ms: i64,
    next_object: u64,
}

#[derive(Clone, Copy)]
struct BlobRecord {
    epochs: u32,
    certified: bool,
}

impl LedgerInner {
    fn new_object_id(&mut self, kind: &str) -> ObjectId {
        self.next_object += 1;
        let mut hasher = blake3::Hasher::new_derive_key("tuber-ledger-v1-object");
        hasher.update(kind.as_bytes());
        hasher.update(&self.next_object.to_le_bytes());
        ObjectId(*hasher.finalize().as_bytes())
    }

    fn cap_for(&self, sender: Address, profile_id: ProfileId) -> Result<CreatorCap> {
        let cap = self
            .caps
            .get(&sender)
            .copied()
            .ok_or(ChainError::CreatorCapNotFound)?;
        if cap.profile_id != profile_id {
            return Err(ChainError::CapMismatch(profile_id));
        }
        Ok(cap)
    }

    fn profile_mut(&mut self, profile_id: ProfileId) -> Result<&mut CreatorProfile> {
        self.profiles
            .get_mut(&profile_id)
            .ok_or(ChainError::ProfileNotFound(profile_id))
    }
}

impl MemoryLedger {
    /// Create an empty ledger with the clock at the current wall time.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                profiles: HashMap::new(),
                posts: HashMap::new(),
                subscriptions: HashMap::new(),
                caps: HashMap::new(),
                balances: HashMap::new(),
                blobs: HashMap::new(),
                clock_ms: now_millis(),
                next_object: 0,
            }),
        }
    }

    /// The shared clock object id.
    pub fn clock_id(&self) -> ClockId {
        ClockId(CLOCK_OBJECT_ID)
    }

    /// Set the chain clock (tests).
    pub fn set_clock(&self, clock_ms: i64) {
        self.inner.write().unwrap().clock_ms = clock_ms;
    }

    /// Advance the chain clock (tests).
    pub fn advance_clock(&self, delta_ms: i64) {
        self.inner.write().unwrap().clock_ms += delta_ms;
    }

    /// Whether a blob id has completed its register and certify phases.
    pub fn is_blob_certified(&self, blob_id: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .blobs
            .get(blob_id)
            .map(|r| r.certified)
            .unwrap_or(false)
    }

    /// The storage lifetime a blob was registered with, if any.
    pub fn blob_storage_epochs(&self, blob_id: &str) -> Option<u32> {
        self.inner
            .read()
            .unwrap()
            .blobs
            .get(blob_id)
            .map(|r| r.epochs)
    }

    /// A creator's accumulated subscribe earnings.
    pub fn balance_of(&self, address: Address) -> u64 {
        self.inner
            .read()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    fn apply_call(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let target = call.target.as_str();
        if target.ends_with("::creator::register") {
            Self::apply_register(inner, sender, call)
        } else if target.ends_with("::creator::add_tier") {
            Self::apply_add_tier(inner, sender, call)
        } else if target.ends_with("::subscription::subscribe") {
            Self::apply_subscribe(inner, sender, call)
        } else if target.ends_with("::creator::publish_post") {
            Self::apply_publish_post(inner, sender, call)
        } else if target.ends_with("::seal_policy::seal_approve") {
            Self::check_seal_approve(inner, sender, call)
        } else if target.ends_with("::blob::register") {
            Self::apply_register_blob(inner, call)
        } else if target.ends_with("::blob::certify") {
            Self::apply_certify_blob(inner, call)
        } else {
            Err(ChainError::TxAborted(format!("unknown target: {target}")))
        }
    }

    /// `register(name, bio, price, clock)` — creates a profile with a
    /// default one-year tier and transfers a creator cap to the sender.
    fn apply_register(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let [name, bio, price, clock] = expect_args::<4>(call)?;
        let name = name.as_str()?;
        let bio = bio.as_str()?;
        let price = price.as_u64()?;
        check_clock(clock)?;

        if inner.caps.contains_key(&sender) {
            return Err(ChainError::TxAborted("address is already a creator".into()));
        }
        validate_tier(DEFAULT_TIER_DURATION_MS, price)
            .map_err(|e| ChainError::TxAborted(e.to_string()))?;

        let profile_id = ProfileId(inner.new_object_id("profile"));
        let cap_id = CapId(inner.new_object_id("cap"));
        let now = inner.clock_ms;

        inner.profiles.insert(
            profile_id,
            CreatorProfile {
                id: profile_id,
                owner: sender,
                name,
                bio,
                x_handle: None,
                avatar_blob_id: None,
                tiers: vec![SubscriptionTier {
                    duration_ms: DEFAULT_TIER_DURATION_MS,
                    price,
                }],
                total_posts: 0,
                total_subscribers: 0,
                created_at: now,
            },
        );
        inner.caps.insert(
            sender,
            CreatorCap {
                id: cap_id,
                profile_id,
            },
        );
        debug!(profile = %profile_id, "registered creator");
        Ok(())
    }

    /// `add_tier(cap, profile, duration_ms, price)` — appends a tier,
    /// bounded to [`MAX_TIERS`].
    fn apply_add_tier(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let [cap, profile, duration, price] = expect_args::<4>(call)?;
        let profile_id = ProfileId(profile.as_object()?);
        let duration_ms = duration.as_u64()?;
        let price = price.as_u64()?;

        let held = inner.cap_for(sender, profile_id)?;
        if cap.as_object()? != held.id.object_id() {
            return Err(ChainError::CapMismatch(profile_id));
        }
        validate_tier(duration_ms, price).map_err(|e| ChainError::TxAborted(e.to_string()))?;

        let profile = inner.profile_mut(profile_id)?;
        if profile.tiers.len() >= MAX_TIERS {
            return Err(ChainError::TxAborted(format!(
                "profile already has {MAX_TIERS} tiers"
            )));
        }
        profile.tiers.push(SubscriptionTier { duration_ms, price });
        Ok(())
    }

    /// `subscribe(profile, payment, clock)` — issues a subscription whose
    /// expiry is chain time plus the matched tier's duration, and credits
    /// the payment to the creator.
    fn apply_subscribe(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let [profile, payment, clock] = expect_args::<3>(call)?;
        let profile_id = ProfileId(profile.as_object()?);
        let amount = payment.as_payment()?;
        check_clock(clock)?;

        let now = inner.clock_ms;
        let profile = inner.profile_mut(profile_id)?;
        let tier = profile
            .tiers
            .iter()
            .find(|t| t.price == amount)
            .copied()
            .ok_or_else(|| {
                ChainError::TxAborted(format!("payment of {amount} matches no tier"))
            })?;

        profile.total_subscribers += 1;
        let owner = profile.owner;

        let sub_id = SubscriptionId(inner.new_object_id("subscription"));
        inner.subscriptions.insert(
            sub_id,
            Subscription {
                id: sub_id,
                profile_id,
                subscriber: sender,
                expires_at: now + tier.duration_ms as i64,
                created_at: now,
            },
        );
        *inner.balances.entry(owner).or_insert(0) += amount;
        debug!(subscription = %sub_id, profile = %profile_id, "subscribed");
        Ok(())
    }

    /// `publish_post(cap, profile, title, preview, blob_id, encrypted,
    /// clock)` — appends an immutable post with a monotonic id.
    fn apply_publish_post(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let [cap, profile, title, preview, blob_id, encrypted, clock] = expect_args::<7>(call)?;
        let profile_id = ProfileId(profile.as_object()?);

        let held = inner.cap_for(sender, profile_id)?;
        if cap.as_object()? != held.id.object_id() {
            return Err(ChainError::CapMismatch(profile_id));
        }
        check_clock(clock)?;

        let now = inner.clock_ms;
        let profile = inner.profile_mut(profile_id)?;
        profile.total_posts += 1;
        let post_id = PostId(profile.total_posts);

        let post = Post {
            post_id,
            title: title.as_str()?,
            preview: preview.as_str()?,
            blob_id: BlobId::new(blob_id.as_str()?),
            encrypted: encrypted.as_bool()?,
            created_at: now,
        };
        inner
            .posts
            .entry(profile_id)
            .or_default()
            .insert(post_id.0, post);
        debug!(profile = %profile_id, post = %post_id, "published post");
        Ok(())
    }

    /// `seal_approve(policy_id, subscription, profile, clock)` — the
    /// on-chain access check. Read-only: aborts if the sender is not
    /// entitled, changes nothing if they are.
    fn check_seal_approve(inner: &mut LedgerInner, sender: Address, call: &MoveCall) -> Result<()> {
        let [policy, subscription, profile, clock] = expect_args::<4>(call)?;
        let policy_id = PolicyId::from_bytes(policy.as_pure_bytes()?)
            .ok_or_else(|| ChainError::TxAborted("policy id has wrong length".into()))?;
        let sub_id = SubscriptionId(subscription.as_object()?);
        let profile_id = ProfileId(profile.as_object()?);
        check_clock(clock)?;

        if policy_id.profile_id() != profile_id {
            return Err(ChainError::TxAborted(
                "policy id does not match profile".into(),
            ));
        }
        // Creators are entitled to their own posts; the subscription
        // argument is not inspected on this path.
        if let Some(profile) = inner.profiles.get(&profile_id) {
            if profile.owner == sender {
                return Ok(());
            }
        }
        let sub = inner
            .subscriptions
            .get(&sub_id)
            .ok_or_else(|| ChainError::TxAborted("subscription not found".into()))?;
        if sub.profile_id != profile_id {
            return Err(ChainError::TxAborted(
                "subscription is for a different profile".into(),
            ));
        }
        if sub.subscriber != sender {
            return Err(ChainError::TxAborted(
                "subscription is owned by a different address".into(),
            ));
        }
        if !sub.is_active_at(inner.clock_ms) {
            return Err(ChainError::TxAborted("subscription has expired".into()));
        }
        Ok(())
    }

    /// `register_blob(blob_id, epochs)` — reserves storage for a blob in
    /// the chain-coupled write flow.
    fn apply_register_blob(inner: &mut LedgerInner, call: &MoveCall) -> Result<()> {
        let [blob_id, epochs] = expect_args::<2>(call)?;
        let blob_id = blob_id.as_str()?;
        let epochs = epochs.as_u64()?;
        if epochs == 0 {
            return Err(ChainError::TxAborted("epochs must be positive".into()));
        }
        inner.blobs.insert(
            blob_id,
            BlobRecord {
                epochs: epochs as u32,
                certified: false,
            },
        );
        Ok(())
    }

    /// `certify_blob(blob_id)` — marks a registered blob as available.
    fn apply_certify_blob(inner: &mut LedgerInner, call: &MoveCall) -> Result<()> {
        let [blob_id] = expect_args::<1>(call)?;
        let blob_id = blob_id.as_str()?;
        let record = inner
            .blobs
            .get_mut(&blob_id)
            .ok_or_else(|| ChainError::TxAborted("blob was never registered".into()))?;
        record.certified = true;
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxExecutor for MemoryLedger {
    async fn execute(&self, tx: SignedTransaction) -> Result<TxDigest> {
        tx.verify()?;
        let digest = tx.digest()?;

        let mut inner = self.inner.write().unwrap();

        // Apply to a scratch copy; commit only if every call succeeds.
        let mut scratch = inner.clone();
        for call in &tx.kind.calls {
            Self::apply_call(&mut scratch, tx.sender, call)?;
        }
        *inner = scratch;

        Ok(digest)
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn get_profile(&self, profile_id: ProfileId) -> Result<Option<CreatorProfile>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.profiles.get(&profile_id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<CreatorProfile>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.profiles.values().cloned().collect())
    }

    async fn get_posts(&self, profile_id: ProfileId) -> Result<Vec<Post>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .posts
            .get(&profile_id)
            .map(|posts| posts.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_post(&self, profile_id: ProfileId, post_id: PostId) -> Result<Option<Post>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .posts
            .get(&profile_id)
            .and_then(|posts| posts.get(&post_id.0).cloned()))
    }

    async fn subscriptions_of(&self, owner: Address) -> Result<Vec<Subscription>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .subscriptions
            .values()
            .filter(|s| s.subscriber == owner)
            .cloned()
            .collect())
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.subscriptions.get(&id).cloned())
    }

    async fn find_creator_cap(&self, owner: Address) -> Result<Option<CreatorCap>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.caps.get(&owner).copied())
    }

    async fn chain_time_ms(&self) -> Result<i64> {
        Ok(self.inner.read().unwrap().clock_ms)
    }
}

fn expect_args<const N: usize>(call: &MoveCall) -> Result<[&crate::tx::CallArg; N]> {
    let args: Vec<&crate::tx::CallArg> = call.args.iter().collect();
    args.try_into().map_err(|_| {
        ChainError::TxAborted(format!(
            "{} expects {N} arguments, got {}",
            call.target,
            call.args.len()
        ))
    })
}

fn check_clock(arg: &crate::tx::CallArg) -> Result<()> {
    if arg.as_object()? != CLOCK_OBJECT_ID {
        return Err(ChainError::TxAborted("expected the shared clock".into()));
    }
    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::tx::{CallArg, TransactionKind};

    fn register_kind(price: u64) -> TransactionKind {
        TransactionKind::new().move_call(
            "pkg::creator::register",
            vec![
                CallArg::pure_string("alice"),
                CallArg::pure_string("bio"),
                CallArg::pure_u64(price),
                CallArg::Object(CLOCK_OBJECT_ID),
            ],
        )
    }

    async fn register(ledger: &MemoryLedger, keypair: &Keypair, price: u64) -> ProfileId {
        let signed = SignedTransaction::sign(register_kind(price), keypair).unwrap();
        ledger.execute(signed).await.unwrap();
        ledger
            .find_creator_cap(keypair.address())
            .await
            .unwrap()
            .unwrap()
            .profile_id
    }

    #[tokio::test]
    async fn test_register_creates_profile_and_cap() {
        let ledger = MemoryLedger::new();
        let keypair = Keypair::generate();
        let profile_id = register(&ledger, &keypair, 100).await;

        let profile = ledger.get_profile(profile_id).await.unwrap().unwrap();
        assert_eq!(profile.owner, keypair.address());
        assert_eq!(profile.tiers.len(), 1);
        assert_eq!(profile.tiers[0].price, 100);
    }

    #[tokio::test]
    async fn test_double_register_aborts() {
        let ledger = MemoryLedger::new();
        let keypair = Keypair::generate();
        register(&ledger, &keypair, 100).await;

        let signed = SignedTransaction::sign(register_kind(200), &keypair).unwrap();
        assert!(matches!(
            ledger.execute(signed).await,
            Err(ChainError::TxAborted(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_issues_subscription_and_pays_creator() {
        let ledger = MemoryLedger::new();
        ledger.set_clock(1_000);
        let creator = Keypair::generate();
        let fan = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;

        let kind = TransactionKind::new().move_call(
            "pkg::subscription::subscribe",
            vec![
                CallArg::Object(profile_id.object_id()),
                CallArg::Payment(100),
                CallArg::Object(CLOCK_OBJECT_ID),
            ],
        );
        let signed = SignedTransaction::sign(kind, &fan).unwrap();
        ledger.execute(signed).await.unwrap();

        let subs = ledger.subscriptions_of(fan.address()).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].profile_id, profile_id);
        assert_eq!(subs[0].expires_at, 1_000 + DEFAULT_TIER_DURATION_MS as i64);
        assert_eq!(ledger.balance_of(creator.address()), 100);

        let profile = ledger.get_profile(profile_id).await.unwrap().unwrap();
        assert_eq!(profile.total_subscribers, 1);
    }

    #[tokio::test]
    async fn test_subscribe_wrong_amount_aborts_atomically() {
        let ledger = MemoryLedger::new();
        let creator = Keypair::generate();
        let fan = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;

        let kind = TransactionKind::new().move_call(
            "pkg::subscription::subscribe",
            vec![
                CallArg::Object(profile_id.object_id()),
                CallArg::Payment(99),
                CallArg::Object(CLOCK_OBJECT_ID),
            ],
        );
        let signed = SignedTransaction::sign(kind, &fan).unwrap();
        assert!(ledger.execute(signed).await.is_err());

        // No partial effects: subscriber count untouched, no subscription.
        let profile = ledger.get_profile(profile_id).await.unwrap().unwrap();
        assert_eq!(profile.total_subscribers, 0);
        assert!(ledger
            .subscriptions_of(fan.address())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_publish_post_monotonic_ids() {
        let ledger = MemoryLedger::new();
        let creator = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;
        let cap = ledger
            .find_creator_cap(creator.address())
            .await
            .unwrap()
            .unwrap();

        for i in 0..3u64 {
            let kind = TransactionKind::new().move_call(
                "pkg::creator::publish_post",
                vec![
                    CallArg::Object(cap.id.object_id()),
                    CallArg::Object(profile_id.object_id()),
                    CallArg::pure_string(&format!("post {i}")),
                    CallArg::pure_string("preview"),
                    CallArg::pure_string("blob"),
                    CallArg::pure_bool(false),
                    CallArg::Object(CLOCK_OBJECT_ID),
                ],
            );
            let signed = SignedTransaction::sign(kind, &creator).unwrap();
            ledger.execute(signed).await.unwrap();
        }

        let posts = ledger.get_posts(profile_id).await.unwrap();
        let ids: Vec<u64> = posts.iter().map(|p| p.post_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_publish_without_cap_aborts() {
        let ledger = MemoryLedger::new();
        let creator = Keypair::generate();
        let stranger = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;

        let kind = TransactionKind::new().move_call(
            "pkg::creator::publish_post",
            vec![
                CallArg::Object(ObjectId::ZERO),
                CallArg::Object(profile_id.object_id()),
                CallArg::pure_string("t"),
                CallArg::pure_string("p"),
                CallArg::pure_string("b"),
                CallArg::pure_bool(true),
                CallArg::Object(CLOCK_OBJECT_ID),
            ],
        );
        let signed = SignedTransaction::sign(kind, &stranger).unwrap();
        assert!(matches!(
            ledger.execute(signed).await,
            Err(ChainError::CreatorCapNotFound)
        ));
    }

    #[tokio::test]
    async fn test_add_tier_bounded() {
        let ledger = MemoryLedger::new();
        let creator = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;
        let cap = ledger
            .find_creator_cap(creator.address())
            .await
            .unwrap()
            .unwrap();

        let add = |price: u64| {
            TransactionKind::new().move_call(
                "pkg::creator::add_tier",
                vec![
                    CallArg::Object(cap.id.object_id()),
                    CallArg::Object(profile_id.object_id()),
                    CallArg::pure_u64(1_000),
                    CallArg::pure_u64(price),
                ],
            )
        };

        // Registration created one tier; two more fit, a third does not.
        for price in [200, 300] {
            let signed = SignedTransaction::sign(add(price), &creator).unwrap();
            ledger.execute(signed).await.unwrap();
        }
        let signed = SignedTransaction::sign(add(400), &creator).unwrap();
        assert!(ledger.execute(signed).await.is_err());

        let profile = ledger.get_profile(profile_id).await.unwrap().unwrap();
        assert_eq!(profile.tiers.len(), MAX_TIERS);
    }

    #[tokio::test]
    async fn test_seal_approve_owner_needs_no_subscription() {
        let ledger = MemoryLedger::new();
        let creator = Keypair::generate();
        let profile_id = register(&ledger, &creator, 100).await;

        let policy_id = PolicyId::derive(profile_id, tuber_core::PolicyNonce::ZERO);
        let approve = || {
            TransactionKind::new().move_call(
                "pkg::seal_policy::seal_approve",
                vec![
                    CallArg::pure_bytes(policy_id.to_bytes().to_vec()),
                    // The subscription slot is ignored for owners; the
                    // profile id fills it.
                    CallArg::Object(profile_id.object_id()),
                    CallArg::Object(profile_id.object_id()),
                    CallArg::Object(CLOCK_OBJECT_ID),
                ],
            )
        };

        let signed = SignedTransaction::sign(approve(), &creator).unwrap();
        ledger.execute(signed).await.unwrap();

        // Anyone else with the same argument shape still aborts.
        let stranger = Keypair::generate();
        let signed = SignedTransaction::sign(approve(), &stranger).unwrap();
        assert!(matches!(
            ledger.execute(signed).await,
            Err(ChainError::TxAborted(_))
        ));
    }
}
