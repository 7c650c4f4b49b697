//! Signed bearer tokens.
//!
//! This module provides:
//! - [`TokenParameters`] - Backdate and lifetime applied to every minted token
//! - [`TokenClaims`] - The JWT payload sent to the API
//! - [`SignedToken`] - A compact, signed token for exactly one request
//! - [`mint_token`] - Build and sign a token for one method and path
//!
//! Tokens are never cached. The client mints a fresh one for every request,
//! which keeps each token bound to a single path through its `scope` claim.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, encode};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountContext;
use crate::credential::ApiCredential;

/// Default number of seconds `iat` is moved into the past.
pub const DEFAULT_BACKDATE_SECONDS: u64 = 60;

/// Default token lifetime in seconds, counted from now.
pub const DEFAULT_EXPIRE_AFTER_SECONDS: u64 = 120;

/// Upper bound for both token timings: one day.
pub const MAX_TOKEN_SECONDS: u64 = 24 * 60 * 60;

/// Error type for token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token parameters are out of range.
    #[error("invalid token parameters: {message}")]
    InvalidParameters { message: String },

    /// Signing the token failed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Timing applied to minted tokens.
///
/// `iat` is set `backdate_seconds` before now to absorb clock skew between
/// this host and the API; `exp` is `expire_after_seconds` after now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenParameters")]
pub struct TokenParameters {
    backdate_seconds: u64,
    expire_after_seconds: u64,
}

#[derive(Deserialize)]
struct RawTokenParameters {
    #[serde(default = "default_backdate")]
    backdate_seconds: u64,
    #[serde(default = "default_expire_after")]
    expire_after_seconds: u64,
}

fn default_backdate() -> u64 {
    DEFAULT_BACKDATE_SECONDS
}

fn default_expire_after() -> u64 {
    DEFAULT_EXPIRE_AFTER_SECONDS
}

impl TryFrom<RawTokenParameters> for TokenParameters {
    type Error = TokenError;

    fn try_from(raw: RawTokenParameters) -> Result<Self, Self::Error> {
        Self::new(raw.backdate_seconds, raw.expire_after_seconds)
    }
}

impl TokenParameters {
    /// Create token parameters.
    ///
    /// `expire_after_seconds` must be greater than zero, and neither value may
    /// exceed [`MAX_TOKEN_SECONDS`].
    pub fn new(backdate_seconds: u64, expire_after_seconds: u64) -> Result<Self, TokenError> {
        if expire_after_seconds == 0 {
            return Err(TokenError::InvalidParameters {
                message: "expire_after_seconds must be greater than zero".to_string(),
            });
        }
        if backdate_seconds > MAX_TOKEN_SECONDS || expire_after_seconds > MAX_TOKEN_SECONDS {
            return Err(TokenError::InvalidParameters {
                message: format!(
                    "backdate_seconds and expire_after_seconds must not exceed {}",
                    MAX_TOKEN_SECONDS
                ),
            });
        }

        Ok(Self {
            backdate_seconds,
            expire_after_seconds,
        })
    }

    /// Seconds `iat` is moved into the past.
    pub fn backdate_seconds(&self) -> u64 {
        self.backdate_seconds
    }

    /// Seconds from now until `exp`.
    pub fn expire_after_seconds(&self) -> u64 {
        self.expire_after_seconds
    }
}

impl Default for TokenParameters {
    fn default() -> Self {
        Self {
            backdate_seconds: DEFAULT_BACKDATE_SECONDS,
            expire_after_seconds: DEFAULT_EXPIRE_AFTER_SECONDS,
        }
    }
}

/// JWT payload of a minted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<String>>,
}

/// A compact, signed bearer token.
///
/// The value is only accessible via [`expose()`](SignedToken::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    /// Expose the compact token.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignedToken([REDACTED])")
    }
}

impl std::fmt::Display for SignedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Build the claims for one request.
///
/// GET requests get a `scope` of exactly `["GET <path_and_query>"]`; other
/// methods carry no scope.
pub fn build_claims(
    method: &Method,
    path_and_query: &str,
    credential: &ApiCredential,
    account: AccountContext,
    parameters: &TokenParameters,
    now: DateTime<Utc>,
) -> TokenClaims {
    let now = now.timestamp();
    let scope = (*method == Method::GET).then(|| vec![format!("GET {}", path_and_query)]);

    TokenClaims {
        iss: credential.issuer_id().to_string(),
        iat: now.saturating_sub(parameters.backdate_seconds as i64),
        exp: now.saturating_add(parameters.expire_after_seconds as i64),
        aud: account.audience().to_string(),
        scope,
    }
}

/// Mint a signed token for one request.
///
/// The header carries the curve's algorithm (`ES256` for P-256 keys) and the
/// credential's key id.
pub fn mint_token(
    method: &Method,
    path_and_query: &str,
    credential: &ApiCredential,
    account: AccountContext,
    parameters: &TokenParameters,
    now: DateTime<Utc>,
) -> Result<SignedToken, TokenError> {
    let claims = build_claims(method, path_and_query, credential, account, parameters, now);

    let key = credential.private_key();
    let mut header = Header::new(key.algorithm());
    header.kid = Some(credential.key_id().to_string());

    let token = encode(&header, &claims, key.encoding_key())?;
    Ok(SignedToken(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyBackend, import_private_key};
    use chrono::TimeZone;

    const P256_PKCS8: &str = include_str!("../tests/fixtures/p256_pkcs8.pem");

    fn credential() -> ApiCredential {
        let key = import_private_key(P256_PKCS8, KeyBackend::Portable).unwrap();
        ApiCredential::new("57246542-96fe-1a63-e053-0824d011072a", "2X9R4HXF34", key).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_parameters() {
        let parameters = TokenParameters::default();
        assert_eq!(parameters.backdate_seconds(), 60);
        assert_eq!(parameters.expire_after_seconds(), 120);
    }

    #[test]
    fn test_zero_expiry_rejected() {
        assert!(TokenParameters::new(0, 0).is_err());
        assert!(TokenParameters::new(0, 120).is_ok());
    }

    #[test]
    fn test_timing_upper_bound() {
        assert!(TokenParameters::new(MAX_TOKEN_SECONDS, MAX_TOKEN_SECONDS).is_ok());
        assert!(TokenParameters::new(0, MAX_TOKEN_SECONDS + 1).is_err());
        assert!(TokenParameters::new(MAX_TOKEN_SECONDS + 1, 120).is_err());
        assert!(TokenParameters::new(0, i64::MAX as u64).is_err());
        assert!(TokenParameters::new(u64::MAX, 120).is_err());

        let invalid = serde_json::from_str::<TokenParameters>(
            r#"{"expire_after_seconds": 9223372036854775807}"#,
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn test_claim_times_at_upper_bound() {
        let parameters = TokenParameters::new(MAX_TOKEN_SECONDS, MAX_TOKEN_SECONDS).unwrap();
        let now = fixed_now();
        let claims = build_claims(
            &Method::GET,
            "/v1/users",
            &credential(),
            AccountContext::Standard,
            &parameters,
            now,
        );

        assert_eq!(claims.iat, now.timestamp() - MAX_TOKEN_SECONDS as i64);
        assert_eq!(claims.exp, now.timestamp() + MAX_TOKEN_SECONDS as i64);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_parameters_deserialize_with_defaults() {
        let parameters: TokenParameters =
            serde_json::from_str(r#"{"backdate_seconds": 0}"#).unwrap();
        assert_eq!(parameters, TokenParameters::new(0, 120).unwrap());

        let invalid = serde_json::from_str::<TokenParameters>(r#"{"expire_after_seconds": 0}"#);
        assert!(invalid.is_err());
    }

    #[test]
    fn test_claim_times() {
        let credential = credential();
        let now = fixed_now();

        for (backdate, expire) in [(0, 1), (60, 120), (300, 1200)] {
            let parameters = TokenParameters::new(backdate, expire).unwrap();
            let claims = build_claims(
                &Method::GET,
                "/v1/users",
                &credential,
                AccountContext::Standard,
                &parameters,
                now,
            );

            assert_eq!(claims.iat, now.timestamp() - backdate as i64);
            assert_eq!(claims.exp, now.timestamp() + expire as i64);
        }
    }

    #[test]
    fn test_get_scope() {
        let credential = credential();
        let claims = build_claims(
            &Method::GET,
            "/v1/users?limit=50",
            &credential,
            AccountContext::Enterprise,
            &TokenParameters::default(),
            fixed_now(),
        );

        assert_eq!(claims.iss, "57246542-96fe-1a63-e053-0824d011072a");
        assert_eq!(claims.aud, "apple-developer-enterprise-v1");
        assert_eq!(claims.scope, Some(vec!["GET /v1/users?limit=50".to_string()]));
    }

    #[test]
    fn test_non_get_has_no_scope() {
        let claims = build_claims(
            &Method::POST,
            "/v1/users",
            &credential(),
            AccountContext::Standard,
            &TokenParameters::default(),
            fixed_now(),
        );

        assert_eq!(claims.scope, None);
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_mint_token_header() {
        let token = mint_token(
            &Method::GET,
            "/v1/users",
            &credential(),
            AccountContext::Standard,
            &TokenParameters::default(),
            fixed_now(),
        )
        .unwrap();

        let header = jsonwebtoken::decode_header(token.expose()).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::ES256);
        assert_eq!(header.kid.as_deref(), Some("2X9R4HXF34"));
        assert_eq!(token.expose().split('.').count(), 3);
    }

    #[test]
    fn test_signed_token_redacted() {
        let token = SignedToken("abc.def.ghi".to_string());
        assert!(!format!("{:?}", token).contains("abc"));
        assert!(!format!("{}", token).contains("abc"));
        assert_eq!(token.authorization_header(), "Bearer abc.def.ghi");
    }
}
