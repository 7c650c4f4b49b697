//! # Connectkit Core
//!
//! Core library for talking to the App Store Connect style REST APIs.
//!
//! This crate provides:
//! - EC private key import from PKCS#8 and SEC1 PEM, with two independent backends
//! - Short-lived ES256/ES384 bearer tokens bound to one request
//! - An authenticated client that follows paged collections to the end
//! - Structured API errors carrying every error entry the server returned
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use connectkit_core::{AccountContext, ApiClient, ApiCredential, KeyBackend};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn list_users(pem: &str) -> Result<(), connectkit_core::ConnectkitError> {
//!     let credential = ApiCredential::from_pem("issuer-id", "KEYID", pem, KeyBackend::ALL)?;
//!     let client = ApiClient::new(AccountContext::Standard, credential.into_shared());
//!     for user in client.get_users(&CancellationToken::new()).await? {
//!         println!("{}", user);
//!     }
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod client;
pub mod credential;
pub mod error;
pub mod key;
pub mod model;
pub mod token;

// Re-export commonly used types at crate root
pub use account::AccountContext;

pub use client::{
    ApiClient,
    ClientError,
    Transport,
    USERS_PATH,
};

pub use credential::{
    ApiCredential,
    CredentialError,
};

pub use error::ConnectkitError;

pub use key::{
    Curve,
    EcParameters,
    EcPrivateKey,
    KeyBackend,
    KeyImportError,
    import_private_key,
    import_with_fallback,
};

pub use model::{
    ApiError,
    ApiException,
    ErrorResponse,
    PagedLinks,
    PagedResult,
    PagingInformation,
    PagingMeta,
    User,
    UserAttributes,
};

pub use token::{
    SignedToken,
    TokenClaims,
    TokenError,
    TokenParameters,
    MAX_TOKEN_SECONDS,
    mint_token,
};
