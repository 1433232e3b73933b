//! Service request engine for the CRM HTTP API.
//!
//! # Overview
//! Every CRM-facing tool talks to the remote API through `ServiceClient`. The
//! remote API speaks a non-standard REST dialect; this crate hides it behind
//! a handful of logical verbs and returns a uniform `Outcome` from each.
//!
//! # Design
//! - `convention` maps each logical verb onto its wire method, headers and
//!   body envelope. Batch endpoints are addressed with a `[]` suffix.
//! - `transport` performs one exchange per call and owns the status
//!   classification rules. The `Transport` trait is the only I/O seam.
//! - `cache_key` derives order-independent keys for an external cache. The
//!   client itself never caches.
//! - `ServiceClient` holds only its immutable config and a transport, so one
//!   instance can be shared by any number of concurrent callers.

pub mod cache_key;
pub mod client;
pub mod config;
pub mod convention;
pub mod error;
pub mod http;
pub mod outcome;
pub mod transport;

pub use cache_key::{cache_key, cache_key_for};
pub use client::{ServiceClient, NO_PARAMS};
pub use config::{ConfigError, ServiceConfig, DEFAULT_TIMEOUT_MS};
pub use convention::{Shape, Verb};
pub use error::ServiceError;
pub use http::{HttpMethod, HttpResponse, WireRequest};
pub use outcome::Outcome;
pub use transport::{classify, HttpTransport, Transport};
