//! Error types for the CRM service client.
//!
//! # Design
//! Every failure the client can report has a dedicated variant, and the
//! `Display` text of each variant is the exact message callers surface to the
//! end user. Nothing in this module is ever returned as `Err` from a verb
//! method; errors travel inside `Outcome::Failure` instead.

use thiserror::Error;

/// Maximum number of body characters kept in an `Api` error excerpt.
pub const BODY_SNIPPET_CHARS: usize = 200;

/// Failures reported by `ServiceClient` verbs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The connection could not be established or was reset.
    #[error("Network error: {0}")]
    Network(String),

    /// The exchange did not complete within the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// The remote API reports authorization failures as HTTP 500 with a
    /// "do not have access" body.
    #[error("Access denied to this endpoint")]
    AccessDenied,

    /// Any other non-success status, with a truncated body excerpt.
    #[error("API Error {status}: {snippet}")]
    Api { status: u16, snippet: String },

    /// The body of a success response was not valid JSON for the target type.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A batch lookup succeeded but yielded zero records.
    #[error("Resource not found or empty response")]
    NotFound,

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to initialise HTTP client: {0}")]
    ClientInit(String),

    /// The request could not be built (unserializable body, non-object
    /// query parameters).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Build an `Api` error from a raw status and body, truncating the body
    /// to `BODY_SNIPPET_CHARS` characters.
    pub fn api(status: u16, body: &str) -> Self {
        let snippet = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body.chars().take(BODY_SNIPPET_CHARS).collect()
        };
        ServiceError::Api { status, snippet }
    }
}
