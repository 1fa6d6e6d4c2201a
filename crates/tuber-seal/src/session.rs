//! Session capabilities.
//!
//! A decrypt attempt is scoped by a short-lived session: a fresh X25519
//! key pair bound to the viewer's address and the deployed package, made
//! usable only once the wallet signs the session's personal-message
//! challenge. Key servers wrap their responses to the session key, so
//! shares in transit are useless to anyone but this session. An expired
//! session is discarded and recreated, never reused.

use serde::{Deserialize, Serialize};

use tuber_chain::{Ed25519PublicKey, Ed25519Signature};
use tuber_core::{Address, ObjectId};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::{Result, SealError};

/// Domain prefix for the personal-message challenge.
const SESSION_DOMAIN: &[u8] = b"tuber-session-v1";

/// A session capability held by the viewer.
///
/// States: fresh (unsigned) -> ready (signed) -> expired. Only a ready,
/// unexpired session produces a certificate.
pub struct SessionKey {
    address: Address,
    package_id: ObjectId,
    secret: X25519StaticSecret,
    created_at_ms: i64,
    ttl_min: u32,
    signature: Option<Ed25519Signature>,
}

impl SessionKey {
    /// Create a fresh session for a viewer, valid for `ttl_min` minutes.
    pub fn create(address: Address, package_id: ObjectId, ttl_min: u32, now_ms: i64) -> Self {
        Self {
            address,
            package_id,
            secret: X25519StaticSecret::generate(),
            created_at_ms: now_ms,
            ttl_min,
            signature: None,
        }
    }

    /// The personal message the wallet must sign to activate the session.
    ///
    /// Binds the domain, package, session public key, and validity window
    /// so a signature cannot be replayed for another session.
    pub fn personal_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(SESSION_DOMAIN.len() + 32 + 32 + 12);
        message.extend_from_slice(SESSION_DOMAIN);
        message.extend_from_slice(self.package_id.as_bytes());
        message.extend_from_slice(self.secret.public_key().as_bytes());
        message.extend_from_slice(&self.created_at_ms.to_le_bytes());
        message.extend_from_slice(&self.ttl_min.to_le_bytes());
        message
    }

    /// Attach the wallet's signature over [`Self::personal_message`].
    pub fn set_signature(&mut self, signature: Ed25519Signature) {
        self.signature = Some(signature);
    }

    /// Whether the time-to-live has elapsed at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        let ttl_ms = self.ttl_min as i64 * 60_000;
        now_ms >= self.created_at_ms + ttl_ms
    }

    /// The session's X25519 secret, for opening re-wrapped shares.
    pub fn secret(&self) -> &X25519StaticSecret {
        &self.secret
    }

    /// Produce the certificate shown to key servers.
    ///
    /// Fails if the session was never signed or has expired.
    pub fn certificate(&self, now_ms: i64) -> Result<SessionCertificate> {
        let signature = self.signature.ok_or(SealError::AuthorizationDeclined)?;
        if self.is_expired(now_ms) {
            return Err(SealError::SessionExpired);
        }
        Ok(SessionCertificate {
            address: self.address,
            package_id: self.package_id,
            session_public: self.secret.public_key(),
            created_at_ms: self.created_at_ms,
            ttl_min: self.ttl_min,
            signature,
        })
    }
}

/// The verifiable, serializable face of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCertificate {
    pub address: Address,
    pub package_id: ObjectId,
    pub session_public: X25519PublicKey,
    pub created_at_ms: i64,
    pub ttl_min: u32,
    pub signature: Ed25519Signature,
}

impl SessionCertificate {
    /// Reconstruct the personal message this certificate claims was signed.
    pub fn personal_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(SESSION_DOMAIN.len() + 32 + 32 + 12);
        message.extend_from_slice(SESSION_DOMAIN);
        message.extend_from_slice(self.package_id.as_bytes());
        message.extend_from_slice(self.session_public.as_bytes());
        message.extend_from_slice(&self.created_at_ms.to_le_bytes());
        message.extend_from_slice(&self.ttl_min.to_le_bytes());
        message
    }

    /// Verify the signature against the claimed address and check expiry.
    ///
    /// Addresses are raw Ed25519 public key bytes, so the address itself
    /// is the verification key.
    pub fn verify(&self, now_ms: i64) -> Result<()> {
        let ttl_ms = self.ttl_min as i64 * 60_000;
        if now_ms >= self.created_at_ms + ttl_ms {
            return Err(SealError::SessionExpired);
        }
        let key = Ed25519PublicKey(*self.address.as_bytes());
        key.verify(&self.personal_message(), &self.signature)
            .map_err(|_| SealError::AccessDenied("invalid session signature".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tuber_chain::Keypair;

    fn signed_session(keypair: &Keypair, now_ms: i64) -> SessionKey {
        let mut session =
            SessionKey::create(keypair.address(), ObjectId::from_bytes([9; 32]), 10, now_ms);
        let signature = keypair.sign(&session.personal_message());
        session.set_signature(signature);
        session
    }

    #[test]
    fn signed_certificate_verifies() {
        let keypair = Keypair::generate();
        let session = signed_session(&keypair, 1_000);
        let cert = session.certificate(1_000).unwrap();
        assert!(cert.verify(1_000).is_ok());
    }

    #[test]
    fn unsigned_session_yields_no_certificate() {
        let keypair = Keypair::generate();
        let session = SessionKey::create(
            keypair.address(),
            ObjectId::from_bytes([9; 32]),
            10,
            1_000,
        );
        assert!(matches!(
            session.certificate(1_000),
            Err(SealError::AuthorizationDeclined)
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let keypair = Keypair::generate();
        let session = signed_session(&keypair, 0);
        let after_ttl = 10 * 60_000;
        assert!(session.is_expired(after_ttl));
        assert!(matches!(
            session.certificate(after_ttl),
            Err(SealError::SessionExpired)
        ));
    }

    #[test]
    fn certificate_from_wrong_signer_fails_verification() {
        let keypair = Keypair::generate();
        let intruder = Keypair::generate();
        let mut session =
            SessionKey::create(keypair.address(), ObjectId::from_bytes([9; 32]), 10, 0);
        session.set_signature(intruder.sign(&session.personal_message()));
        let cert = session.certificate(0).unwrap();
        assert!(matches!(
            cert.verify(0),
            Err(SealError::AccessDenied(_))
        ));
    }

    #[test]
    fn expired_certificate_fails_verification() {
        let keypair = Keypair::generate();
        let session = signed_session(&keypair, 0);
        let cert = session.certificate(0).unwrap();
        assert!(matches!(
            cert.verify(11 * 60_000),
            Err(SealError::SessionExpired)
        ));
    }
}
