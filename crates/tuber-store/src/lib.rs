//! # Tuber Store
//!
//! Blob storage clients for the Tuber content pipeline. Blobs are
//! immutable, content-addressed, and rented for a number of storage
//! epochs chosen at upload time.
//!
//! ## Key Types
//!
//! - [`BlobStore`] - The async trait for uploads and retrieval
//! - [`HttpBlobStore`] - Stateless publisher/aggregator HTTP client
//! - [`ChainBlobStore`] - Trust-minimized register, upload, certify flow
//! - [`WriteFlow`] - The phase state machine behind [`ChainBlobStore`]
//! - [`MemoryBlobStore`] - In-memory store for tests
//!
//! A deployment picks exactly one concrete store; the two write paths are
//! never mixed inside a single publish.

pub mod error;
pub mod flow;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use flow::{BlobSink, ChainBlobStore, StoreTargets, WriteFlow};
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::BlobStore;
