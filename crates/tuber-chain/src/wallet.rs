//! The wallet seam.
//!
//! The pipeline never touches key material directly: it asks a `Wallet`
//! to sign a personal message (the session challenge) or to sign and
//! execute a transaction. A declined signature surfaces as
//! [`ChainError::AuthorizationDeclined`] and is a user cancellation, not a
//! system fault.

use std::sync::Arc;

use async_trait::async_trait;

use tuber_core::{Address, TxDigest};

use crate::crypto::{Ed25519Signature, Keypair};
use crate::error::Result;
use crate::ledger::TxExecutor;
use crate::tx::{SignedTransaction, TransactionKind};

/// The wallet collaborator interface.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// The connected account address.
    fn address(&self) -> Address;

    /// Sign an arbitrary personal message.
    async fn sign_personal_message(&self, message: &[u8]) -> Result<Ed25519Signature>;

    /// Sign a transaction and submit it for execution, waiting for finality.
    async fn sign_and_execute(&self, kind: TransactionKind) -> Result<TxDigest>;
}

/// A wallet backed by a local keypair and a transaction executor.
pub struct LocalWallet {
    keypair: Keypair,
    executor: Arc<dyn TxExecutor>,
}

impl LocalWallet {
    /// Create a wallet over a keypair and an executor.
    pub fn new(keypair: Keypair, executor: Arc<dyn TxExecutor>) -> Self {
        Self { keypair, executor }
    }

    /// The wallet's keypair (for test fixtures).
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.keypair.address()
    }

    async fn sign_personal_message(&self, message: &[u8]) -> Result<Ed25519Signature> {
        Ok(self.keypair.sign(message))
    }

    async fn sign_and_execute(&self, kind: TransactionKind) -> Result<TxDigest> {
        let signed = SignedTransaction::sign(kind, &self.keypair)?;
        self.executor.execute(signed).await
    }
}
