//! Top-level error types for connectkit.

use thiserror::Error;

use crate::client::ClientError;
use crate::credential::CredentialError;
use crate::key::KeyImportError;
use crate::token::TokenError;

/// Top-level error type encompassing all connectkit errors.
#[derive(Debug, Error)]
pub enum ConnectkitError {
    /// Error from key import.
    #[error("key import error: {0}")]
    KeyImport(#[from] KeyImportError),

    /// Error from credential construction.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Error from token minting.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Error from an API request.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}
