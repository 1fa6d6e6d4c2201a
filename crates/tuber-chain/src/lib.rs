//! # Tuber Chain
//!
//! Ledger collaborators for the Tuber content pipeline.
//!
//! The chain itself is external; this crate models the seams the pipeline
//! needs and nothing more:
//!
//! - **Wallet**: sign a personal message, sign-and-execute a transaction
//! - **LedgerReader**: eventually-consistent reads of profiles, posts,
//!   subscriptions, and capabilities
//! - **ChainWriter**: the state-changing operations (register, add tier,
//!   subscribe, publish pointer)
//! - **ApprovalBuilder**: the kind-only access-check transaction shown to
//!   key servers as entitlement proof
//! - **MemoryLedger**: an in-memory chain with atomic execution, standing
//!   in for the real ledger in tests

pub mod approval;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod tx;
pub mod wallet;
pub mod writer;

pub use approval::{parse_approval, ApprovalBuilder, ApprovalCall, ApprovalStrategy};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{ChainError, Result};
pub use ledger::{
    active_subscription, CreatorCap, CreatorProfile, LedgerReader, Post, Subscription,
    SubscriptionTier, TxExecutor,
};
pub use memory::{MemoryLedger, CLOCK_OBJECT_ID, DEFAULT_TIER_DURATION_MS};
pub use tx::{CallArg, CallTargets, MoveCall, SignedTransaction, TransactionKind};
pub use wallet::{LocalWallet, Wallet};
pub use writer::ChainWriter;
