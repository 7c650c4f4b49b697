//! Wire types exchanged with the API.
//!
//! - [`error`] - Error documents and the [`ApiException`] built from them
//! - [`paging`] - Paged collection responses and their links
//! - [`user`] - The `users` resource

pub mod error;
pub mod paging;
pub mod user;

pub use error::{ApiError, ApiException, ErrorResponse};
pub use paging::{PagedLinks, PagedResult, PagingInformation, PagingMeta};
pub use user::{User, UserAttributes};
