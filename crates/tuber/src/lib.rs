//! # Tuber
//!
//! Unified API for encrypted creator-subscription publishing: creators
//! seal posts for their subscribers, subscribers unlock them through a
//! threshold of independent key servers, and a public ledger carries the
//! pointers, subscriptions, and entitlement checks.
//!
//! ## Overview
//!
//! - [`Publisher`] runs the creator pipeline: validate, upload media,
//!   build the envelope, seal, upload, write the on-chain pointer.
//! - [`Viewer`] runs the subscriber pipeline: paywall gate, download,
//!   approval transaction, session signing, threshold decryption.
//! - [`DeploymentConfig`] pins everything the two pipelines must agree
//!   on; one value serves both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tuber::{Publisher, PublishRequest};
//! use tuber_core::{PostInput, ProfileId};
//!
//! async fn example(publisher: Publisher, profile_id: ProfileId) {
//!     let request = PublishRequest {
//!         profile_id,
//!         post: PostInput {
//!             title: "hello".into(),
//!             preview: "a preview".into(),
//!             content: "subscriber-only content".into(),
//!             media: vec![],
//!         },
//!         encrypted: true,
//!     };
//!     let receipt = publisher.publish(request).await.unwrap();
//!     println!("published {}", receipt.blob_id);
//! }
//! ```

pub mod config;
pub mod error;
pub mod publish;
pub mod view;

pub use config::{DeploymentConfig, StorageStrategy};
pub use error::{Result, TuberError};
pub use publish::{PublishReceipt, PublishRequest, Publisher};
pub use view::{
    FailureReason, MediaHandle, ViewOutcome, ViewSlot, ViewState, ViewedPost, Viewer,
};
