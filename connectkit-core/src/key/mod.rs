//! EC private key import.
//!
//! This module provides:
//! - [`EcPrivateKey`] - A validated EC private key used to sign bearer tokens
//! - [`EcParameters`] - Raw scalar and public point coordinates of a key
//! - [`KeyBackend`] - Selects which importer parses the PEM text
//! - [`import_private_key`] - Import a key with one backend
//! - [`import_with_fallback`] - Try several backends in order
//!
//! # Backends
//!
//! The two backends are independent implementations of the same contract.
//! [`KeyBackend::Portable`] decodes the PKCS#8 / SEC1 ASN.1 structures itself
//! and rebuilds the key from its raw parameters. [`KeyBackend::Native`] hands
//! the key to the curve crates' own importers, picking the SEC1 curve from the
//! key's declared parameters. A failure in one backend
//! never prevents the other from being tried.
//!
//! # Example
//!
//! ```rust,ignore
//! use connectkit_core::key::{import_with_fallback, KeyBackend};
//!
//! let pem = std::fs::read_to_string("AuthKey_ABC123.p8")?;
//! let key = import_with_fallback(&pem, KeyBackend::ALL)?;
//! assert_eq!(key.curve().name(), "P-256");
//! ```

use std::fmt;

use der::asn1::ObjectIdentifier;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::EncodePrivateKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

mod native;
mod portable;

/// `id-ecPublicKey` from RFC 5480.
pub(crate) const EC_PUBLIC_KEY_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

const SECP256R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

/// Error type for key import operations.
#[derive(Debug, Error)]
pub enum KeyImportError {
    /// The input is not well-formed PEM.
    #[error("malformed PEM: {message}")]
    MalformedPem { message: String },

    /// The PEM holds something other than an EC private key.
    #[error("unsupported key type: {kind}")]
    UnsupportedKeyType { kind: String },

    /// The key is declared on a curve this crate cannot sign with.
    #[error("unsupported curve: {oid}")]
    UnsupportedCurve { oid: String },

    /// Neither the PKCS#8 wrapper nor the SEC1 structure names a curve.
    #[error("EC private key does not declare a named curve")]
    MissingCurve,

    /// The key structure decoded but the key material is unusable.
    #[error("invalid key: {message}")]
    InvalidKey { message: String },

    /// Raw EC parameters failed validation.
    #[error("invalid EC parameters: {message}")]
    InvalidParameters { message: String },
}

/// Which importer turns PEM text into an [`EcPrivateKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyBackend {
    /// ASN.1 decoding and key reconstruction done in this crate.
    Portable,
    /// The curve crates' own PKCS#8 / SEC1 PEM importers.
    Native,
}

impl KeyBackend {
    /// Every backend, in the default trial order.
    pub const ALL: &'static [KeyBackend] = &[KeyBackend::Portable, KeyBackend::Native];

    /// Get the backend name as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyBackend::Portable => "portable",
            KeyBackend::Native => "native",
        }
    }
}

impl fmt::Display for KeyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portable" => Ok(KeyBackend::Portable),
            "native" => Ok(KeyBackend::Native),
            other => Err(format!("unknown key backend: {}", other)),
        }
    }
}

/// Named curves supported for token signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// NIST P-256 (secp256r1), signs ES256 tokens.
    P256,
    /// NIST P-384 (secp384r1), signs ES384 tokens.
    P384,
}

impl Curve {
    /// Resolve a curve from its named-curve object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self, KeyImportError> {
        if oid == SECP256R1_OID {
            Ok(Curve::P256)
        } else if oid == SECP384R1_OID {
            Ok(Curve::P384)
        } else {
            Err(KeyImportError::UnsupportedCurve {
                oid: oid.to_string(),
            })
        }
    }

    /// The curve's named-curve object identifier.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Curve::P256 => SECP256R1_OID,
            Curve::P384 => SECP384R1_OID,
        }
    }

    /// Size in bytes of a field element (and of the private scalar).
    pub fn field_size(&self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
        }
    }

    /// JWS algorithm used to sign with a key on this curve.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Curve::P256 => Algorithm::ES256,
            Curve::P384 => Algorithm::ES384,
        }
    }

    /// Human-readable curve name.
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw EC key parameters: private scalar `d` and public point `(x, y)`.
///
/// All three are unsigned big-endian byte strings. [`EcPrivateKey::from_parameters`]
/// only accepts them when they share the curve's field size.
#[derive(Clone)]
pub struct EcParameters {
    pub curve: Curve,
    pub d: Zeroizing<Vec<u8>>,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

impl fmt::Debug for EcParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcParameters")
            .field("curve", &self.curve)
            .field("d", &"[REDACTED]")
            .field("x_len", &self.x.len())
            .field("y_len", &self.y.len())
            .finish()
    }
}

#[derive(Clone)]
enum SecretScalar {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

/// A validated EC private key, ready to sign tokens.
///
/// The key is immutable and cheap to share behind an `Arc`. Debug output never
/// includes key material.
#[derive(Clone)]
pub struct EcPrivateKey {
    secret: SecretScalar,
    encoding_key: EncodingKey,
}

impl EcPrivateKey {
    /// Build a key from raw parameters.
    ///
    /// Rejects parameters whose `d`, `x` and `y` are not all exactly the curve's
    /// field size, and parameters whose public point is not `d·G`.
    pub fn from_parameters(params: &EcParameters) -> Result<Self, KeyImportError> {
        let size = params.curve.field_size();
        if params.d.len() != size || params.x.len() != size || params.y.len() != size {
            return Err(KeyImportError::InvalidParameters {
                message: format!(
                    "D, Q.x and Q.y must all be {} bytes for {} (got {}, {}, {})",
                    size,
                    params.curve,
                    params.d.len(),
                    params.x.len(),
                    params.y.len()
                ),
            });
        }

        let secret = match params.curve {
            Curve::P256 => {
                let secret = p256::SecretKey::from_slice(&params.d).map_err(|_| {
                    KeyImportError::InvalidParameters {
                        message: "private scalar is out of range".to_string(),
                    }
                })?;
                let expected = p256::EncodedPoint::from_affine_coordinates(
                    p256::FieldBytes::from_slice(&params.x),
                    p256::FieldBytes::from_slice(&params.y),
                    false,
                );
                if secret.public_key().to_encoded_point(false) != expected {
                    return Err(public_point_mismatch());
                }
                SecretScalar::P256(secret)
            }
            Curve::P384 => {
                let secret = p384::SecretKey::from_slice(&params.d).map_err(|_| {
                    KeyImportError::InvalidParameters {
                        message: "private scalar is out of range".to_string(),
                    }
                })?;
                let expected = p384::EncodedPoint::from_affine_coordinates(
                    p384::FieldBytes::from_slice(&params.x),
                    p384::FieldBytes::from_slice(&params.y),
                    false,
                );
                if secret.public_key().to_encoded_point(false) != expected {
                    return Err(public_point_mismatch());
                }
                SecretScalar::P384(secret)
            }
        };

        Self::from_secret(secret)
    }

    pub(crate) fn from_p256(secret: p256::SecretKey) -> Result<Self, KeyImportError> {
        Self::from_secret(SecretScalar::P256(secret))
    }

    pub(crate) fn from_p384(secret: p384::SecretKey) -> Result<Self, KeyImportError> {
        Self::from_secret(SecretScalar::P384(secret))
    }

    fn from_secret(secret: SecretScalar) -> Result<Self, KeyImportError> {
        let document = match &secret {
            SecretScalar::P256(key) => key.to_pkcs8_der(),
            SecretScalar::P384(key) => key.to_pkcs8_der(),
        }
        .map_err(|e| KeyImportError::InvalidKey {
            message: format!("failed to encode signing key: {}", e),
        })?;

        Ok(Self {
            encoding_key: EncodingKey::from_ec_der(document.as_bytes()),
            secret,
        })
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> Curve {
        match self.secret {
            SecretScalar::P256(_) => Curve::P256,
            SecretScalar::P384(_) => Curve::P384,
        }
    }

    /// JWS algorithm this key signs with.
    pub fn algorithm(&self) -> Algorithm {
        self.curve().algorithm()
    }

    /// Export the key as fixed-size raw parameters.
    pub fn parameters(&self) -> EcParameters {
        let (d, point) = match &self.secret {
            SecretScalar::P256(key) => (
                key.to_bytes().to_vec(),
                key.public_key().to_encoded_point(false).as_bytes().to_vec(),
            ),
            SecretScalar::P384(key) => (
                key.to_bytes().to_vec(),
                key.public_key().to_encoded_point(false).as_bytes().to_vec(),
            ),
        };
        let size = self.curve().field_size();

        EcParameters {
            curve: self.curve(),
            d: Zeroizing::new(d),
            x: point[1..1 + size].to_vec(),
            y: point[1 + size..].to_vec(),
        }
    }

    /// Uncompressed SEC1 encoding of the public point (`04 || x || y`).
    pub fn public_key_sec1(&self) -> Vec<u8> {
        match &self.secret {
            SecretScalar::P256(key) => key.public_key().to_encoded_point(false).as_bytes().to_vec(),
            SecretScalar::P384(key) => key.public_key().to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Key used by `jsonwebtoken` to sign with this private key.
    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Key that verifies signatures produced by this private key.
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_ec_der(&self.public_key_sec1())
    }

    /// Sign `message`, returning the base64url JWS signature.
    pub fn sign(&self, message: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::crypto::sign(message, &self.encoding_key, self.algorithm())
    }

    /// Verify a base64url JWS signature over `message` against this key's public point.
    pub fn verify(&self, signature: &str, message: &[u8]) -> bool {
        jsonwebtoken::crypto::verify(signature, message, &self.decoding_key(), self.algorithm())
            .unwrap_or(false)
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.curve())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn public_point_mismatch() -> KeyImportError {
    KeyImportError::InvalidParameters {
        message: "public point does not match the private scalar".to_string(),
    }
}

/// Import an EC private key from PEM text with one backend.
///
/// Accepts `PRIVATE KEY` (PKCS#8) and `EC PRIVATE KEY` (SEC1) documents on
/// P-256 or P-384. Never panics on bad input.
pub fn import_private_key(pem: &str, backend: KeyBackend) -> Result<EcPrivateKey, KeyImportError> {
    let result = match backend {
        KeyBackend::Portable => portable::import(pem),
        KeyBackend::Native => native::import(pem),
    };

    match &result {
        Ok(key) => debug!("{} backend imported {} key", backend, key.curve()),
        Err(e) => debug!("{} backend failed to import key: {}", backend, e),
    }

    result
}

/// Import a key by trying each backend in order.
///
/// Returns the first success. When every backend fails the last error is
/// returned; an empty backend list yields [`KeyImportError::InvalidKey`].
pub fn import_with_fallback(
    pem: &str,
    backends: &[KeyBackend],
) -> Result<EcPrivateKey, KeyImportError> {
    let mut last_error = None;

    for &backend in backends {
        match import_private_key(pem, backend) {
            Ok(key) => return Ok(key),
            Err(e) => {
                warn!("key import with {} backend failed: {}", backend, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| KeyImportError::InvalidKey {
        message: "no key backend was selected".to_string(),
    }))
}
