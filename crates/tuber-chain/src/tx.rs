//! Transaction value model.
//!
//! A deliberately small model of ledger transactions: a list of entrypoint
//! calls with object and pure arguments. "Kind-only" bytes are the CBOR
//! serialization of the call list without sender or gas data; they describe
//! what a transaction would do without being executable, which is exactly
//! what the access-approval flow needs.

use serde::{Deserialize, Serialize};

use tuber_core::{Address, ObjectId, TxDigest};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{ChainError, Result};

/// An argument to an entrypoint call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// A reference to an on-chain object.
    Object(ObjectId),
    /// An inline value, encoded per its type.
    Pure(Vec<u8>),
    /// A coin split from the sender's gas, by amount in the smallest unit.
    Payment(u64),
}

impl CallArg {
    /// A pure UTF-8 string argument.
    pub fn pure_string(s: &str) -> Self {
        Self::Pure(s.as_bytes().to_vec())
    }

    /// A pure u64 argument (little-endian).
    pub fn pure_u64(v: u64) -> Self {
        Self::Pure(v.to_le_bytes().to_vec())
    }

    /// A pure bool argument.
    pub fn pure_bool(v: bool) -> Self {
        Self::Pure(vec![v as u8])
    }

    /// A pure raw-bytes argument.
    pub fn pure_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Pure(bytes.into())
    }

    /// Read back as an object id.
    pub fn as_object(&self) -> Result<ObjectId> {
        match self {
            Self::Object(id) => Ok(*id),
            other => Err(ChainError::MalformedTransaction(format!(
                "expected object argument, got {other:?}"
            ))),
        }
    }

    /// Read back as a UTF-8 string.
    pub fn as_str(&self) -> Result<String> {
        match self {
            Self::Pure(bytes) => String::from_utf8(bytes.clone()).map_err(|_| {
                ChainError::MalformedTransaction("pure argument is not UTF-8".into())
            }),
            other => Err(ChainError::MalformedTransaction(format!(
                "expected pure string argument, got {other:?}"
            ))),
        }
    }

    /// Read back as a u64.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Self::Pure(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    ChainError::MalformedTransaction("pure argument is not a u64".into())
                })?;
                Ok(u64::from_le_bytes(arr))
            }
            other => Err(ChainError::MalformedTransaction(format!(
                "expected pure u64 argument, got {other:?}"
            ))),
        }
    }

    /// Read back as a bool.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Pure(bytes) if bytes.len() == 1 => Ok(bytes[0] != 0),
            other => Err(ChainError::MalformedTransaction(format!(
                "expected pure bool argument, got {other:?}"
            ))),
        }
    }

    /// Read back as raw pure bytes.
    pub fn as_pure_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::Pure(bytes) => Ok(bytes),
            other => Err(ChainError::MalformedTransaction(format!(
                "expected pure argument, got {other:?}"
            ))),
        }
    }

    /// Read back as a payment amount.
    pub fn as_payment(&self) -> Result<u64> {
        match self {
            Self::Payment(amount) => Ok(*amount),
            other => Err(ChainError::MalformedTransaction(format!(
                "expected payment argument, got {other:?}"
            ))),
        }
    }
}

/// A single entrypoint call: `package::module::function` plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCall {
    pub target: String,
    pub args: Vec<CallArg>,
}

/// The kind of a transaction: its call list, without sender or gas data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionKind {
    pub calls: Vec<MoveCall>,
}

impl TransactionKind {
    /// Start an empty transaction kind.
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// Append a call.
    pub fn move_call(mut self, target: impl Into<String>, args: Vec<CallArg>) -> Self {
        self.calls.push(MoveCall {
            target: target.into(),
            args,
        });
        self
    }

    /// Serialize to kind-only CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ChainError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from kind-only CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| ChainError::MalformedTransaction(e.to_string()))
    }
}

impl Default for TransactionKind {
    fn default() -> Self {
        Self::new()
    }
}

/// A transaction signed by its sender, ready for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub kind: TransactionKind,
    pub sender: Address,
    pub sender_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl SignedTransaction {
    /// Sign a transaction kind with the sender's keypair.
    pub fn sign(kind: TransactionKind, keypair: &Keypair) -> Result<Self> {
        let message = signing_message(&kind, keypair.address())?;
        Ok(Self {
            kind,
            sender: keypair.address(),
            sender_key: keypair.public_key(),
            signature: keypair.sign(&message),
        })
    }

    /// Verify the sender's signature.
    pub fn verify(&self) -> Result<()> {
        if self.sender_key.address() != self.sender {
            return Err(ChainError::InvalidSignature);
        }
        let message = signing_message(&self.kind, self.sender)?;
        self.sender_key.verify(&message, &self.signature)
    }

    /// The transaction digest.
    pub fn digest(&self) -> Result<TxDigest> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ChainError::SerializationError(e.to_string()))?;
        Ok(TxDigest(*blake3::hash(&buf).as_bytes()))
    }
}

/// Domain separator for transaction signing.
const TX_SIGN_DOMAIN: &[u8] = b"tuber-tx-v1";

fn signing_message(kind: &TransactionKind, sender: Address) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    message.extend_from_slice(TX_SIGN_DOMAIN);
    message.extend_from_slice(sender.as_bytes());
    message.extend_from_slice(&kind.to_bytes()?);
    Ok(message)
}

/// Fully-qualified entrypoint targets for one deployed package.
#[derive(Debug, Clone)]
pub struct CallTargets {
    pub register: String,
    pub add_tier: String,
    pub subscribe: String,
    pub publish_post: String,
    pub seal_approve: String,
}

impl CallTargets {
    /// Build the target set for a package id.
    pub fn for_package(package_id: ObjectId) -> Self {
        let pkg = package_id.to_hex();
        Self {
            register: format!("{pkg}::creator::register"),
            add_tier: format!("{pkg}::creator::add_tier"),
            subscribe: format!("{pkg}::subscription::subscribe"),
            publish_post: format!("{pkg}::creator::publish_post"),
            seal_approve: format!("{pkg}::seal_policy::seal_approve"),
        }
    }
}
