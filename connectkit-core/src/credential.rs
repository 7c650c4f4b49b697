//! API credentials.

use std::sync::Arc;

use thiserror::Error;

use crate::key::{EcPrivateKey, KeyBackend, KeyImportError, import_with_fallback};

/// Error type for credential construction.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The issuer id was empty.
    #[error("issuer id must not be empty")]
    EmptyIssuerId,

    /// The key id was empty.
    #[error("key id must not be empty")]
    EmptyKeyId,

    /// The private key could not be imported.
    #[error("key import failed: {0}")]
    KeyImport(#[from] KeyImportError),
}

/// An API key: issuer id, key id and the EC private key that signs tokens.
///
/// Immutable once built. Share it between clients with [`ApiCredential::into_shared`]
/// or by wrapping it in an `Arc` directly.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    issuer_id: String,
    key_id: String,
    private_key: EcPrivateKey,
}

impl ApiCredential {
    /// Create a credential from an already imported key.
    pub fn new(
        issuer_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key: EcPrivateKey,
    ) -> Result<Self, CredentialError> {
        let issuer_id = issuer_id.into();
        let key_id = key_id.into();

        if issuer_id.trim().is_empty() {
            return Err(CredentialError::EmptyIssuerId);
        }
        if key_id.trim().is_empty() {
            return Err(CredentialError::EmptyKeyId);
        }

        Ok(Self {
            issuer_id,
            key_id,
            private_key,
        })
    }

    /// Create a credential from PEM text, trying `backends` in order.
    pub fn from_pem(
        issuer_id: impl Into<String>,
        key_id: impl Into<String>,
        pem: &str,
        backends: &[KeyBackend],
    ) -> Result<Self, CredentialError> {
        let private_key = import_with_fallback(pem, backends)?;
        Self::new(issuer_id, key_id, private_key)
    }

    /// The issuer id (`iss` claim).
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// The key id (`kid` header).
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The signing key.
    pub fn private_key(&self) -> &EcPrivateKey {
        &self.private_key
    }

    /// Wrap the credential for sharing across clients.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
