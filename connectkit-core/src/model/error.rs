//! Structured API errors.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

const UNKNOWN_ERROR: &str = "Unknown error.";

/// Error document returned in the body of a failed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// One or more errors. Absent or empty means the failure is unexplained.
    #[serde(default)]
    pub errors: Option<Vec<ApiError>>,
}

impl ErrorResponse {
    /// Parse an error body. Anything that is not an error document yields no entries.
    pub fn parse(body: &str) -> Vec<ApiError> {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|response| response.errors)
            .unwrap_or_default()
    }
}

/// One error from a failed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable, dot-separated hierarchical code.
    #[serde(default)]
    pub code: Option<String>,

    /// HTTP status of this error. May differ from the response status when
    /// a request produced several errors.
    #[serde(default)]
    pub status: Option<String>,

    /// Unique id of this error instance.
    #[serde(default)]
    pub id: Option<String>,

    /// Short summary. Not for programmatic handling.
    #[serde(default)]
    pub title: Option<String>,

    /// Detailed explanation. Not for programmatic handling.
    #[serde(default)]
    pub detail: Option<String>,

    /// Either a `parameter` or a `pointer` describing what caused the error.
    #[serde(default)]
    pub source: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("error");
        write!(f, "{}", title)?;
        if let Some(status) = &self.status {
            write!(f, " (status {})", status)?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// A non-success response, with every error entry the server returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiException {
    status: StatusCode,
    errors: Vec<ApiError>,
}

impl ApiException {
    /// Create an exception from a response status and its parsed errors.
    pub fn new(status: StatusCode, errors: Vec<ApiError>) -> Self {
        Self { status, errors }
    }

    /// Create an exception from a response status and its raw body.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        Self::new(status, ErrorResponse::parse(body))
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Every error entry, in server order. Empty when the body was not an error document.
    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    /// Summary message: the first entry's detail, else its title, else "Unknown error.".
    pub fn message(&self) -> &str {
        self.errors
            .first()
            .and_then(|error| error.detail.as_deref().or(error.title.as_deref()))
            .unwrap_or(UNKNOWN_ERROR)
    }
}

impl fmt::Display for ApiException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API request failed with status {}: {}", self.status, self.message())
    }
}

impl std::error::Error for ApiException {}
