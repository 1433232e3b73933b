//! Wire-level request and response types.
//!
//! # Design
//! These types describe HTTP exchanges as plain data. The adapter builds a
//! `WireRequest`, a `Transport` executes it and hands back an `HttpResponse`,
//! and `transport::classify` turns that into an `Outcome`. Keeping the
//! network out of the middle step makes request building and classification
//! deterministic and testable without a server.

use std::fmt;

/// Path prefix every endpoint name is appended to.
pub const API_PREFIX: &str = "/api/json/reply/";

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_CONTENT_LENGTH: &str = "content-length";
/// Tells the remote host to treat a POST as a read.
pub const HEADER_METHOD_OVERRIDE: &str = "x-http-method-override";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// HTTP methods the remote dialect uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete HTTP exchange, built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: HttpMethod,
    /// Absolute URL, including any query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl WireRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A fully buffered response as returned by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}
