//! One HTTP exchange per call, and the rules for classifying its result.
//!
//! # Design
//! `Transport` is the I/O seam: it takes a `WireRequest` and returns the fully
//! buffered `HttpResponse`, or a `Network`/`Timeout` error. Everything about
//! what a status code *means* lives in `classify`, which is pure and shared by
//! every transport implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

use crate::error::ServiceError;
use crate::http::{HttpMethod, HttpResponse, WireRequest};
use crate::outcome::Outcome;

/// Body marker the remote API uses when it reports an authorization failure
/// as HTTP 500.
pub const ACCESS_DENIED_MARKER: &str = "do not have access";

/// Executes wire requests.
///
/// Implementations must buffer the whole body, give up after `timeout`, and
/// report connection-level failures as `ServiceError::Network` and expiry as
/// `ServiceError::Timeout`. They must not interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        request: WireRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, ServiceError>;
}

/// `Transport` backed by reqwest.
///
/// Idle connection pooling is disabled, so nothing outlives a call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ServiceError> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ServiceError::ClientInit(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(
        &self,
        request: WireRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, ServiceError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            // Decode only once the whole body is buffered so multi-byte
            // characters split across chunks survive.
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        };

        // Dropping the exchange future on expiry aborts the in-flight request.
        match tokio::time::timeout(timeout, exchange).await {
            Err(_) => Err(ServiceError::Timeout),
            Ok(Err(error)) if error.is_timeout() => Err(ServiceError::Timeout),
            Ok(Err(error)) => Err(ServiceError::Network(error.to_string())),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

/// Map a buffered response onto an `Outcome`.
///
/// 200 (and any other 2xx except 204) parses a non-empty body as JSON; 204
/// never carries data; a 500 mentioning `ACCESS_DENIED_MARKER` is an access
/// failure; every other status is an `Api` error.
pub fn classify<T: DeserializeOwned>(response: &HttpResponse) -> Outcome<T> {
    match response.status {
        204 => Outcome::success(None),
        200..=299 => parse_body(&response.body),
        500 if response.body.contains(ACCESS_DENIED_MARKER) => {
            Outcome::failure(ServiceError::AccessDenied)
        }
        status => Outcome::failure(ServiceError::api(status, &response.body)),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Outcome<T> {
    if body.is_empty() {
        return Outcome::success(None);
    }
    match serde_json::from_str(body) {
        Ok(data) => Outcome::success(Some(data)),
        Err(e) => Outcome::failure(ServiceError::Parse(e.to_string())),
    }
}
