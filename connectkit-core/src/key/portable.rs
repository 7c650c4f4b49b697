//! Portable key importer.
//!
//! Decodes the PEM and ASN.1 itself, recomputes the public point from the
//! private scalar and rebuilds the key through [`EcPrivateKey::from_parameters`].

use der::asn1::ObjectIdentifier;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use super::{Curve, EC_PUBLIC_KEY_OID, EcParameters, EcPrivateKey, KeyImportError};

const PKCS8_LABEL: &str = "PRIVATE KEY";
const SEC1_LABEL: &str = "EC PRIVATE KEY";

pub(super) fn import(pem: &str) -> Result<EcPrivateKey, KeyImportError> {
    let (label, der) = der::pem::decode_vec(pem.trim().as_bytes()).map_err(|e| {
        KeyImportError::MalformedPem {
            message: e.to_string(),
        }
    })?;

    let (curve, scalar) = match label {
        PKCS8_LABEL => decode_pkcs8(&der)?,
        SEC1_LABEL => decode_sec1(&der, None)?,
        other => {
            return Err(KeyImportError::UnsupportedKeyType {
                kind: other.to_string(),
            });
        }
    };

    let params = derive_parameters(curve, &scalar)?;
    EcPrivateKey::from_parameters(&params)
}

fn decode_pkcs8(der: &[u8]) -> Result<(Curve, Zeroizing<Vec<u8>>), KeyImportError> {
    let info = pkcs8::PrivateKeyInfo::try_from(der).map_err(|e| KeyImportError::InvalidKey {
        message: format!("invalid PKCS#8 structure: {}", e),
    })?;

    if info.algorithm.oid != EC_PUBLIC_KEY_OID {
        return Err(KeyImportError::UnsupportedKeyType {
            kind: info.algorithm.oid.to_string(),
        });
    }

    let declared = info.algorithm.parameters_oid().ok();
    decode_sec1(info.private_key, declared)
}

fn decode_sec1(
    der: &[u8],
    declared: Option<ObjectIdentifier>,
) -> Result<(Curve, Zeroizing<Vec<u8>>), KeyImportError> {
    let key = sec1::EcPrivateKey::try_from(der).map_err(|e| KeyImportError::InvalidKey {
        message: format!("invalid SEC1 structure: {}", e),
    })?;

    let embedded = key.parameters.and_then(|params| params.named_curve());
    let oid = match (declared, embedded) {
        (Some(outer), Some(inner)) if outer != inner => {
            return Err(KeyImportError::InvalidKey {
                message: format!("conflicting curve identifiers {} and {}", outer, inner),
            });
        }
        (Some(oid), _) | (None, Some(oid)) => oid,
        (None, None) => return Err(KeyImportError::MissingCurve),
    };

    let curve = Curve::from_oid(oid)?;
    Ok((curve, Zeroizing::new(key.private_key.to_vec())))
}

/// Compute `Q = d·G` and normalize `d`, `Q.x` and `Q.y` to one length.
fn derive_parameters(curve: Curve, scalar: &[u8]) -> Result<EcParameters, KeyImportError> {
    let scalar = strip_leading_zeros(scalar, curve.field_size());

    let point = match curve {
        Curve::P256 => {
            let secret = p256::SecretKey::from_slice(scalar).map_err(|_| invalid_scalar())?;
            let q = p256::ProjectivePoint::GENERATOR * *secret.to_nonzero_scalar();
            q.to_affine().to_encoded_point(false).as_bytes().to_vec()
        }
        Curve::P384 => {
            let secret = p384::SecretKey::from_slice(scalar).map_err(|_| invalid_scalar())?;
            let q = p384::ProjectivePoint::GENERATOR * *secret.to_nonzero_scalar();
            q.to_affine().to_encoded_point(false).as_bytes().to_vec()
        }
    };

    // Uncompressed SEC1 point: 0x04 || x || y
    let coordinates = &point[1..];
    let (x, y) = coordinates.split_at(coordinates.len() / 2);

    // Strict validators reject D, Q.x and Q.y of different lengths.
    let len = scalar.len().max(x.len()).max(y.len());

    Ok(EcParameters {
        curve,
        d: Zeroizing::new(pad_left(scalar, len)),
        x: pad_left(x, len),
        y: pad_left(y, len),
    })
}

/// Drop leading zero bytes beyond `min_len`.
fn strip_leading_zeros(bytes: &[u8], min_len: usize) -> &[u8] {
    let mut start = 0;
    while bytes.len() - start > min_len && bytes[start] == 0 {
        start += 1;
    }
    &bytes[start..]
}

/// Left-pad `bytes` with zeros to `len`. Longer input is returned unchanged.
fn pad_left(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes.to_vec();
    }

    let mut padded = vec![0u8; len];
    padded[len - bytes.len()..].copy_from_slice(bytes);
    padded
}

fn invalid_scalar() -> KeyImportError {
    KeyImportError::InvalidKey {
        message: "private scalar is not valid for the declared curve".to_string(),
    }
}
