//! Native key importer.
//!
//! Hands the key straight to the curve crates' PKCS#8 and SEC1 importers.
//! Any rejection becomes a [`KeyImportError`].

use p256::pkcs8::DecodePrivateKey;

use super::{Curve, EcPrivateKey, KeyImportError};

const SEC1_LABEL: &str = "EC PRIVATE KEY";

pub(super) fn import(pem: &str) -> Result<EcPrivateKey, KeyImportError> {
    let pem = pem.trim();

    if der::pem::decode_label(pem.as_bytes()).is_ok_and(|label| label == SEC1_LABEL) {
        return import_sec1(pem);
    }

    // PKCS#8 carries the curve OID, which the importer checks against the
    // curve it is decoding for.
    if let Ok(secret) = p256::SecretKey::from_pkcs8_pem(pem) {
        return EcPrivateKey::from_p256(secret);
    }
    if let Ok(secret) = p384::SecretKey::from_pkcs8_pem(pem) {
        return EcPrivateKey::from_p384(secret);
    }

    Err(KeyImportError::InvalidKey {
        message: "not a P-256 or P-384 private key in PKCS#8 or SEC1 PEM form".to_string(),
    })
}

/// The SEC1 importers accept any scalar that fits the curve and ignore the
/// declared parameters, so the curve is picked from the declaration first.
fn import_sec1(pem: &str) -> Result<EcPrivateKey, KeyImportError> {
    let (_, der) = der::pem::decode_vec(pem.as_bytes()).map_err(|e| {
        KeyImportError::MalformedPem {
            message: e.to_string(),
        }
    })?;

    let key = sec1::EcPrivateKey::try_from(der.as_slice()).map_err(|e| {
        KeyImportError::InvalidKey {
            message: format!("invalid SEC1 structure: {}", e),
        }
    })?;
    let oid = key
        .parameters
        .and_then(|params| params.named_curve())
        .ok_or(KeyImportError::MissingCurve)?;

    match Curve::from_oid(oid)? {
        Curve::P256 => p256::SecretKey::from_sec1_der(&der)
            .map_err(|_| rejected(Curve::P256))
            .and_then(EcPrivateKey::from_p256),
        Curve::P384 => p384::SecretKey::from_sec1_der(&der)
            .map_err(|_| rejected(Curve::P384))
            .and_then(EcPrivateKey::from_p384),
    }
}

fn rejected(curve: Curve) -> KeyImportError {
    KeyImportError::InvalidKey {
        message: format!("{} importer rejected the SEC1 key", curve),
    }
}
