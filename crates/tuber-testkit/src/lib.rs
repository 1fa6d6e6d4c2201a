//! # Tuber Testkit
//!
//! Testing utilities for the Tuber pipeline.
//!
//! ## Overview
//!
//! - **Fixtures**: an in-memory ledger, blob store, and key-server group
//!   wired together, plus wallet helpers
//! - **Generators**: proptest strategies for ids, nonces, and envelopes
//! - **Golden vectors**: pinned envelope JSON to catch wire-format drift
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use tuber_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let creator = fixture.wallet();
//! let profile_id = fixture.register_creator(creator, "alice").await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{DecliningWallet, FaultyWallet, TestFixture, TEST_PACKAGE, TEST_PRICE};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
