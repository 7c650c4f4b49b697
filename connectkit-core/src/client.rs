//! Authenticated API client.
//!
//! [`ApiClient`] signs every request with a freshly minted token, turns
//! non-success responses into [`ApiException`]s and follows `next` links until
//! a paged collection is exhausted.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use connectkit_core::{AccountContext, ApiClient, ApiCredential, KeyBackend};
//! use tokio_util::sync::CancellationToken;
//!
//! let pem = std::fs::read_to_string("AuthKey_2X9R4HXF34.p8")?;
//! let credential = ApiCredential::from_pem(
//!     "57246542-96fe-1a63-e053-0824d011072a",
//!     "2X9R4HXF34",
//!     &pem,
//!     KeyBackend::ALL,
//! )?
//! .into_shared();
//!
//! let client = ApiClient::new(AccountContext::Standard, credential);
//! let users = client.get_users(&CancellationToken::new()).await?;
//! println!("{} users", users.len());
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::account::AccountContext;
use crate::credential::ApiCredential;
use crate::model::error::ApiException;
use crate::model::paging::{PagedResult, link_path_and_query};
use crate::model::user::User;
use crate::token::{TokenError, TokenParameters, mint_token};

/// Path of the users collection.
pub const USERS_PATH: &str = "/v1/users";

static SHARED_TRANSPORT: LazyLock<Arc<reqwest::Client>> =
    LazyLock::new(|| Arc::new(reqwest::Client::new()));

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error(transparent)]
    Api(#[from] ApiException),

    /// A success response body did not match the expected shape.
    #[error("failed to decode response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A pagination link could not be parsed.
    #[error("invalid pagination link {link}: {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },

    /// Minting the request token failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// The caller cancelled the operation.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// The API exception, if the server rejected the request.
    pub fn as_api_exception(&self) -> Option<&ApiException> {
        match self {
            ClientError::Api(exception) => Some(exception),
            _ => None,
        }
    }
}

/// The HTTP client a [`ApiClient`] sends requests through.
///
/// An owned transport lives and dies with the client. A shared transport is
/// borrowed from the caller (or the process-wide default) and is never torn
/// down by the client.
#[derive(Debug)]
pub enum Transport {
    /// Created for, and released with, one client.
    Owned(reqwest::Client),
    /// Shared with other clients; the client only holds a reference.
    Shared(Arc<reqwest::Client>),
}

impl Transport {
    /// A new transport owned by the client it is given to.
    pub fn owned() -> Self {
        Transport::Owned(reqwest::Client::new())
    }

    /// The process-wide shared transport.
    ///
    /// Pooled connections belong to the tokio runtime that opened them. A
    /// process that runs several runtimes in turn (one per `#[tokio::test]`,
    /// for example) should give each runtime its own client through
    /// [`Transport::owned`] or [`Transport::Shared`] instead.
    pub fn shared() -> Self {
        Transport::Shared(Arc::clone(&SHARED_TRANSPORT))
    }

    /// Whether the client owns this transport.
    pub fn is_owned(&self) -> bool {
        matches!(self, Transport::Owned(_))
    }

    fn http(&self) -> &reqwest::Client {
        match self {
            Transport::Owned(client) => client,
            Transport::Shared(client) => client,
        }
    }
}

/// Client for one account context, authenticated with one credential.
///
/// Requests are issued one at a time. The credential is shared read-only, so
/// any number of clients can use the same [`ApiCredential`] concurrently.
#[derive(Debug)]
pub struct ApiClient {
    account: AccountContext,
    credential: Arc<ApiCredential>,
    base_url: String,
    token_parameters: TokenParameters,
    transport: Transport,
}

impl ApiClient {
    /// Create a client that uses the process-wide shared transport.
    pub fn new(account: AccountContext, credential: Arc<ApiCredential>) -> Self {
        Self::with_transport(account, credential, Transport::shared())
    }

    /// Create a client with an explicit transport.
    pub fn with_transport(
        account: AccountContext,
        credential: Arc<ApiCredential>,
        transport: Transport,
    ) -> Self {
        Self {
            account,
            credential,
            base_url: account.base_url().to_string(),
            token_parameters: TokenParameters::default(),
            transport,
        }
    }

    /// Send requests to `base_url` instead of the account's host.
    ///
    /// The token audience still follows the account context.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the token parameters.
    pub fn with_token_parameters(mut self, parameters: TokenParameters) -> Self {
        self.token_parameters = parameters;
        self
    }

    /// Change the token parameters used for subsequent requests.
    pub fn set_token_parameters(&mut self, parameters: TokenParameters) {
        self.token_parameters = parameters;
    }

    pub fn token_parameters(&self) -> TokenParameters {
        self.token_parameters
    }

    pub fn account(&self) -> AccountContext {
        self.account
    }

    pub fn credential(&self) -> &Arc<ApiCredential> {
        &self.credential
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// GET `path_and_query` and deserialize the response.
    ///
    /// An empty success body yields `T::default()`. A non-success status is
    /// returned as [`ClientError::Api`] with every error entry the body held.
    pub async fn get<T>(
        &self,
        path_and_query: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Default,
    {
        let token = mint_token(
            &Method::GET,
            path_and_query,
            &self.credential,
            self.account,
            &self.token_parameters,
            Utc::now(),
        )?;

        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("GET {} ({} account)", url, self.account);

        let request = self
            .transport
            .http()
            .get(&url)
            .header(AUTHORIZATION, token.authorization_header());

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            body = response.text() => body?,
        };
        debug!("GET {} returned {} ({} bytes)", path_and_query, status, body.len());

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(T::default());
            }
            return serde_json::from_str(&body).map_err(|source| ClientError::Decode {
                path: path_and_query.to_string(),
                source,
            });
        }

        let exception = ApiException::from_body(status, &body);
        warn!(
            "GET {} failed with {} ({} error entries): {}",
            path_and_query,
            status,
            exception.errors().len(),
            exception.message()
        );
        Err(exception.into())
    }

    /// Fetch every item of a paged collection, following `next` links.
    ///
    /// Items are returned in the order the server sent them. Any failure
    /// aborts the walk and discards the pages already fetched.
    pub async fn fetch_all<T>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut page: PagedResult<T> = self.get(path, cancel).await?;
        let mut items = page.data.take().unwrap_or_default();
        let mut pages = 1;

        while let Some(next) = page.next_link() {
            let next_path = link_path_and_query(next).map_err(|source| ClientError::InvalidLink {
                link: next.to_string(),
                source,
            })?;

            page = self.get(&next_path, cancel).await?;
            if let Some(data) = page.data.take() {
                items.extend(data);
            }

            pages += 1;
            debug!("fetched page {} of {} ({} items so far)", pages, path, items.len());
        }

        debug!("fetched {} items from {} in {} pages", items.len(), path, pages);
        Ok(items)
    }

    /// Fetch every user on the team.
    pub async fn get_users(&self, cancel: &CancellationToken) -> Result<Vec<User>, ClientError> {
        self.fetch_all(USERS_PATH, cancel).await
    }
}
