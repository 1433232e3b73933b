//! Verb-level client for the remote CRM API.
//!
//! # Design
//! `ServiceClient` holds an immutable `ServiceConfig` and a `Transport`, and
//! nothing else. Each verb builds a fresh `WireRequest` through the
//! convention table, hands it to the transport, and classifies the response.
//! The `build_*` methods expose the request half on its own so callers can
//! inspect exactly what goes on the wire.
//!
//! No verb returns `Err` or panics: serialization problems, network failures
//! and unexpected statuses all come back as `Outcome::Failure`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::convention::{build_request, Shape, Verb};
use crate::error::ServiceError;
use crate::http::{HttpResponse, WireRequest};
use crate::outcome::Outcome;
use crate::transport::{classify, HttpTransport, Transport};

/// Typed "no parameters" for verbs that take `Option<&P>`.
pub const NO_PARAMS: Option<&Value> = None;

/// Key the remote API expects in single-record batch lookups.
const BATCH_ID_FIELD: &str = "Id";

/// Stateless client; safe to share across tasks behind an `Arc` or by
/// reference.
#[derive(Debug, Clone)]
pub struct ServiceClient<T = HttpTransport> {
    config: ServiceConfig,
    transport: T,
}

impl ServiceClient<HttpTransport> {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }
}

impl<T: Transport> ServiceClient<T> {
    pub fn with_transport(config: ServiceConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn build_fetch<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: Option<&P>,
    ) -> Result<WireRequest, ServiceError> {
        build_request(&self.config, Verb::Fetch, Shape::Single, endpoint, to_payload(params)?)
    }

    pub fn build_fetch_query<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: Option<&P>,
    ) -> Result<WireRequest, ServiceError> {
        build_request(&self.config, Verb::FetchQuery, Shape::Single, endpoint, to_payload(params)?)
    }

    pub fn build_mutate<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&P>,
    ) -> Result<WireRequest, ServiceError> {
        build_request(&self.config, Verb::Mutate, Shape::Single, endpoint, to_payload(body)?)
    }

    pub fn build_partial_update<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        patch: &P,
    ) -> Result<WireRequest, ServiceError> {
        build_request(
            &self.config,
            Verb::PartialUpdate,
            Shape::Single,
            endpoint,
            to_payload(Some(patch))?,
        )
    }

    pub fn build_fetch_batch<P: Serialize>(
        &self,
        endpoint: &str,
        params: &[P],
    ) -> Result<WireRequest, ServiceError> {
        build_request(&self.config, Verb::Fetch, Shape::Batch, endpoint, to_payload(Some(params))?)
    }

    /// Run one exchange and classify the response.
    pub async fn execute<R: DeserializeOwned>(&self, request: WireRequest) -> Outcome<R> {
        let span = tracing::debug_span!(
            "crm.request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        async {
            match self.transport.exchange(request, self.config.timeout()).await {
                Ok(response) => {
                    let outcome = classify(&response);
                    log_outcome(&response, &outcome);
                    outcome
                }
                Err(error) => {
                    tracing::warn!(%error, "crm exchange failed");
                    Outcome::failure(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Logical GET carried as a POST with the method-override header, for
    /// reads that need structured parameters. No params sends an empty body.
    pub async fn fetch<R: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: Option<&P>,
    ) -> Outcome<R> {
        match self.build_fetch(endpoint, params) {
            Ok(request) => self.execute(request).await,
            Err(error) => Outcome::failure(error),
        }
    }

    /// True GET with params flattened into the query string, in the order
    /// the object yields them. Use this only for endpoints that accept
    /// query-string parameters.
    pub async fn fetch_query<R: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        params: Option<&P>,
    ) -> Outcome<R> {
        match self.build_fetch_query(endpoint, params) {
            Ok(request) => self.execute(request).await,
            Err(error) => Outcome::failure(error),
        }
    }

    /// Create or replace (plain POST).
    pub async fn mutate<R: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&P>,
    ) -> Outcome<R> {
        match self.build_mutate(endpoint, body) {
            Ok(request) => self.execute(request).await,
            Err(error) => Outcome::failure(error),
        }
    }

    /// PATCH with the payload wrapped as `{"Patch": patch}`.
    pub async fn partial_update<R: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        patch: &P,
    ) -> Outcome<R> {
        match self.build_partial_update(endpoint, patch) {
            Ok(request) => self.execute(request).await,
            Err(error) => Outcome::failure(error),
        }
    }

    /// `fetch` against the array form (`<endpoint>[]`) of an endpoint.
    pub async fn fetch_batch<R: DeserializeOwned, P: Serialize>(
        &self,
        endpoint: &str,
        params: &[P],
    ) -> Outcome<Vec<R>> {
        match self.build_fetch_batch(endpoint, params) {
            Ok(request) => self.execute(request).await,
            Err(error) => Outcome::failure(error),
        }
    }

    /// Look up one record through the batch convention (`[{"Id": id}]`) and
    /// unwrap the first element.
    ///
    /// A successful call that returns no elements is reported as
    /// `ServiceError::NotFound`: under this contract an empty batch cannot be
    /// told apart from a missing record. Transport and API failures pass
    /// through unchanged.
    pub async fn fetch_one_by_batch<R: DeserializeOwned, I: Serialize>(
        &self,
        endpoint: &str,
        id: I,
    ) -> Outcome<R> {
        let id = match serde_json::to_value(id) {
            Ok(id) => id,
            Err(e) => return Outcome::failure(ServiceError::InvalidRequest(e.to_string())),
        };
        let mut lookup = Map::new();
        lookup.insert(BATCH_ID_FIELD.to_string(), id);

        match self.fetch_batch::<R, _>(endpoint, &[Value::Object(lookup)]).await {
            Outcome::Success { data, cached } => match data.and_then(|items| items.into_iter().next()) {
                Some(first) => Outcome::Success {
                    data: Some(first),
                    cached,
                },
                None => Outcome::failure(ServiceError::NotFound),
            },
            Outcome::Failure { error } => Outcome::Failure { error },
        }
    }
}

fn to_payload<P: Serialize + ?Sized>(payload: Option<&P>) -> Result<Option<Value>, ServiceError> {
    payload
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| ServiceError::InvalidRequest(e.to_string()))
}

fn log_outcome<R>(response: &HttpResponse, outcome: &Outcome<R>) {
    match outcome.error() {
        None => tracing::debug!(status = response.status, "crm request succeeded"),
        Some(error) => tracing::warn!(status = response.status, %error, "crm request failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;

    /// Returns one canned result and records every request it sees.
    struct StubTransport {
        result: Result<HttpResponse, ServiceError>,
        seen: Mutex<Vec<WireRequest>>,
    }

    impl StubTransport {
        fn responding(status: u16, body: &str) -> Self {
            Self {
                result: Ok(HttpResponse::new(status, body)),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: ServiceError) -> Self {
            Self {
                result: Err(error),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn exchange(
            &self,
            request: WireRequest,
            _timeout: Duration,
        ) -> Result<HttpResponse, ServiceError> {
            self.seen.lock().unwrap().push(request);
            self.result.clone()
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Contact {
        id: i64,
        name: String,
    }

    fn client(transport: StubTransport) -> ServiceClient<StubTransport> {
        ServiceClient::with_transport(ServiceConfig::new("crm.example.com", "tok"), transport)
    }

    fn last_request(client: &ServiceClient<StubTransport>) -> WireRequest {
        client.transport.seen.lock().unwrap().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn fetch_one_by_batch_unwraps_first_element() {
        let c = client(StubTransport::responding(
            200,
            r#"[{"Id":7,"Name":"Ada"},{"Id":8,"Name":"Bob"}]"#,
        ));
        let outcome: Outcome<Contact> = c.fetch_one_by_batch("Contacts", 7).await;
        assert_eq!(
            outcome,
            Outcome::success(Some(Contact {
                id: 7,
                name: "Ada".to_string()
            }))
        );

        let req = last_request(&c);
        assert_eq!(req.method, HttpMethod::Post);
        assert!(req.url.ends_with("/api/json/reply/Contacts[]"));
        assert_eq!(req.header("x-http-method-override"), Some("GET"));
        assert_eq!(req.body.as_deref(), Some(r#"[{"Id":7}]"#));
    }

    #[tokio::test]
    async fn fetch_one_by_batch_maps_empty_array_to_not_found() {
        let c = client(StubTransport::responding(200, "[]"));
        let outcome: Outcome<Value> = c.fetch_one_by_batch("Contacts", 7).await;
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Resource not found or empty response")
        );
    }

    #[tokio::test]
    async fn fetch_one_by_batch_maps_absent_data_to_not_found() {
        let c = client(StubTransport::responding(204, ""));
        let outcome: Outcome<Value> = c.fetch_one_by_batch("Contacts", 7).await;
        assert_eq!(outcome.error(), Some(&ServiceError::NotFound));
    }

    #[tokio::test]
    async fn fetch_one_by_batch_passes_api_errors_through() {
        let c = client(StubTransport::responding(500, "You do not have access"));
        let outcome: Outcome<Value> = c.fetch_one_by_batch("Invoices", 1).await;
        assert_eq!(outcome.error(), Some(&ServiceError::AccessDenied));
    }

    #[tokio::test]
    async fn transport_errors_become_failures() {
        let c = client(StubTransport::failing(ServiceError::Timeout));
        let outcome: Outcome<Value> = c.fetch("Contacts", NO_PARAMS).await;
        assert_eq!(outcome.error_message().as_deref(), Some("Request timeout"));

        let c = client(StubTransport::failing(ServiceError::Network(
            "connection refused".to_string(),
        )));
        let outcome: Outcome<Value> = c.mutate("Contacts", Some(&json!({}))).await;
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Network error: connection refused")
        );
    }

    #[tokio::test]
    async fn fetch_query_issues_plain_get() {
        let c = client(StubTransport::responding(200, "[]"));
        let outcome: Outcome<Vec<Value>> =
            c.fetch_query("Contacts", Some(&json!({"a": 1, "b": true}))).await;
        assert!(outcome.is_success());

        let req = last_request(&c);
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.url.ends_with("/Contacts?a=1&b=true"), "{}", req.url);
        assert!(req.header("x-http-method-override").is_none());
    }

    #[tokio::test]
    async fn partial_update_sends_patch_envelope() {
        let c = client(StubTransport::responding(204, ""));
        let outcome: Outcome<Value> = c
            .partial_update("Contacts/7", &json!({"Name": "Ada L."}))
            .await;
        assert_eq!(outcome, Outcome::success(None));

        let req = last_request(&c);
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.body.as_deref(), Some(r#"{"Patch":{"Name":"Ada L."}}"#));
    }

    #[tokio::test]
    async fn non_object_query_params_fail_without_a_request() {
        let c = client(StubTransport::responding(200, "[]"));
        let outcome: Outcome<Value> = c.fetch_query("Contacts", Some(&json!("raw"))).await;
        assert!(matches!(outcome.error(), Some(ServiceError::InvalidRequest(_))));
        assert!(c.transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcomes_are_never_marked_cached() {
        let c = client(StubTransport::responding(200, "42"));
        let outcome: Outcome<u32> = c.fetch("Counter", NO_PARAMS).await;
        assert_eq!(
            outcome,
            Outcome::Success {
                data: Some(42),
                cached: false
            }
        );
    }
}
