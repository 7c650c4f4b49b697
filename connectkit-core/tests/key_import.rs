//! Integration tests for EC private key import.
//!
//! Both backends must accept the same keys, produce the same key material
//! and reject the same inputs.

use connectkit_core::{
    Curve, EcPrivateKey, KeyBackend, KeyImportError, import_private_key, import_with_fallback,
};
use jsonwebtoken::{Algorithm, DecodingKey};

const P256_PKCS8: &str = include_str!("fixtures/p256_pkcs8.pem");
const P256_SEC1: &str = include_str!("fixtures/p256_sec1.pem");
const P256_SEC1_NO_CURVE: &str = include_str!("fixtures/p256_sec1_no_curve.pem");
const P256_SEC1_PADDED_SCALAR: &str = include_str!("fixtures/p256_sec1_padded_scalar.pem");
const P256_PUBLIC: &str = include_str!("fixtures/p256_public.pem");
const P256_SHORT_SCALAR: &str = include_str!("fixtures/p256_short_scalar.pem");
const P256_SHORT_SCALAR_PUBLIC: &str = include_str!("fixtures/p256_short_scalar_public.pem");
const P384_PKCS8: &str = include_str!("fixtures/p384_pkcs8.pem");
const SECP256K1_PKCS8: &str = include_str!("fixtures/secp256k1_pkcs8.pem");
const RSA_PKCS8: &str = include_str!("fixtures/rsa_pkcs8.pem");
const ED25519_PKCS8: &str = include_str!("fixtures/ed25519_pkcs8.pem");

const MESSAGE: &[u8] = b"header.payload";

/// Helper to import a key with every backend.
fn import_all(pem: &str) -> Vec<EcPrivateKey> {
    KeyBackend::ALL
        .iter()
        .map(|&backend| {
            import_private_key(pem, backend)
                .unwrap_or_else(|e| panic!("{} backend rejected key: {}", backend, e))
        })
        .collect()
}

/// Check that `key` signs for the public key in `public_pem`.
fn assert_matches_public_key(key: &EcPrivateKey, public_pem: &str) {
    let public = DecodingKey::from_ec_pem(public_pem.as_bytes()).unwrap();
    let signature = key.sign(MESSAGE).unwrap();
    let verified =
        jsonwebtoken::crypto::verify(&signature, MESSAGE, &public, key.algorithm()).unwrap();
    assert!(verified);
}

#[test]
fn test_pkcs8_and_sec1_on_both_backends() {
    for pem in [P256_PKCS8, P256_SEC1] {
        let keys = import_all(pem);

        for key in &keys {
            assert_eq!(key.curve(), Curve::P256);
            assert_eq!(key.algorithm(), Algorithm::ES256);
            assert_matches_public_key(key, P256_PUBLIC);
        }
        assert_eq!(keys[0].public_key_sec1(), keys[1].public_key_sec1());
    }
}

#[test]
fn test_backends_verify_each_other() {
    let portable = import_private_key(P256_PKCS8, KeyBackend::Portable).unwrap();
    let native = import_private_key(P256_SEC1, KeyBackend::Native).unwrap();

    let signature = portable.sign(MESSAGE).unwrap();
    assert!(native.verify(&signature, MESSAGE));

    let signature = native.sign(MESSAGE).unwrap();
    assert!(portable.verify(&signature, MESSAGE));
    assert!(!portable.verify(&signature, b"other message"));
}

#[test]
fn test_short_scalar_is_padded() {
    for key in import_all(P256_SHORT_SCALAR) {
        let params = key.parameters();
        assert_eq!(params.d.len(), 32);
        assert_eq!(params.x.len(), 32);
        assert_eq!(params.y.len(), 32);
        assert_eq!(params.d[0], 0);

        assert_matches_public_key(&key, P256_SHORT_SCALAR_PUBLIC);
    }
}

#[test]
fn test_p384_signs_es384() {
    let keys = import_all(P384_PKCS8);

    for key in &keys {
        assert_eq!(key.curve(), Curve::P384);
        assert_eq!(key.algorithm(), Algorithm::ES384);

        let params = key.parameters();
        assert_eq!((params.d.len(), params.x.len(), params.y.len()), (48, 48, 48));
    }

    let signature = keys[0].sign(MESSAGE).unwrap();
    assert!(keys[1].verify(&signature, MESSAGE));
}

#[test]
fn test_parameters_rebuild_the_same_key() {
    let key = import_private_key(P256_PKCS8, KeyBackend::Native).unwrap();
    let rebuilt = EcPrivateKey::from_parameters(&key.parameters()).unwrap();

    assert_eq!(rebuilt.public_key_sec1(), key.public_key_sec1());
}

#[test]
fn test_rejects_non_ec_keys() {
    for pem in [RSA_PKCS8, ED25519_PKCS8] {
        let err = import_private_key(pem, KeyBackend::Portable).unwrap_err();
        assert!(matches!(err, KeyImportError::UnsupportedKeyType { .. }), "{:?}", err);

        assert!(import_private_key(pem, KeyBackend::Native).is_err());
    }
}

#[test]
fn test_rejects_unsupported_curve() {
    let err = import_private_key(SECP256K1_PKCS8, KeyBackend::Portable).unwrap_err();
    match err {
        KeyImportError::UnsupportedCurve { oid } => assert_eq!(oid, "1.3.132.0.10"),
        other => panic!("expected UnsupportedCurve, got {:?}", other),
    }

    assert!(import_private_key(SECP256K1_PKCS8, KeyBackend::Native).is_err());
}

#[test]
fn test_rejects_garbage_on_every_backend() {
    let truncated = &P256_PKCS8[..P256_PKCS8.len() / 2];

    for pem in ["", "   \n", "not a key", truncated] {
        for &backend in KeyBackend::ALL {
            assert!(
                import_private_key(pem, backend).is_err(),
                "{} backend accepted {:?}",
                backend,
                pem
            );
        }
        assert!(import_with_fallback(pem, KeyBackend::ALL).is_err());
    }
}

#[test]
fn test_sec1_without_curve_rejected_by_both_backends() {
    for &backend in KeyBackend::ALL {
        let err = import_private_key(P256_SEC1_NO_CURVE, backend).unwrap_err();
        assert!(
            matches!(err, KeyImportError::MissingCurve),
            "{} backend: {:?}",
            backend,
            err
        );
    }
}

#[test]
fn test_fallback_first_success_or_last_error() {
    let backends = [KeyBackend::Native, KeyBackend::Portable];
    let key = import_with_fallback(P256_SEC1, &backends).unwrap();
    assert_matches_public_key(&key, P256_PUBLIC);

    // Every backend fails, so the error comes from the last one tried.
    let backends = [KeyBackend::Portable, KeyBackend::Native];
    let err = import_with_fallback(RSA_PKCS8, &backends).unwrap_err();
    assert!(matches!(err, KeyImportError::InvalidKey { .. }), "{:?}", err);
}

#[test]
fn test_fallback_recovers_when_first_backend_fails() {
    // A zero-prefixed 33 byte scalar is only normalized by the portable backend.
    assert!(import_private_key(P256_SEC1_PADDED_SCALAR, KeyBackend::Native).is_err());

    let backends = [KeyBackend::Native, KeyBackend::Portable];
    let key = import_with_fallback(P256_SEC1_PADDED_SCALAR, &backends).unwrap();

    assert_eq!(key.curve(), Curve::P256);
    assert_eq!(key.parameters().d.len(), 32);
    assert_matches_public_key(&key, P256_PUBLIC);
}
