//! The remote API's calling conventions as a fixed lookup table.
//!
//! # Design
//! The remote dialect does not map logical intents onto HTTP verbs the usual
//! way: parameterized reads are POSTs flagged with an override header, partial
//! updates wrap their payload in a `Patch` envelope, and many endpoints only
//! accept arrays, addressed with a literal `[]` suffix. Each logical verb maps
//! to one `WireRule` row; the resource shape only contributes the suffix. A new
//! verb is a new row, not a new branch in the client.

use reqwest::Url;
use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::http::{
    HttpMethod, WireRequest, API_PREFIX, CONTENT_TYPE_JSON, HEADER_AUTHORIZATION,
    HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, HEADER_METHOD_OVERRIDE,
};

/// Suffix the remote API uses to address the array form of an endpoint.
pub const BATCH_SUFFIX: &str = "[]";

/// Abstract read/write intent, independent of the HTTP method on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Read with a JSON body (POST + override header).
    Fetch,
    /// Read with query-string parameters (true GET).
    FetchQuery,
    /// Create or replace (POST).
    Mutate,
    /// Partial update (PATCH with a `Patch` envelope).
    PartialUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    Batch,
}

/// How the payload is placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// Serialized as-is into the body; absent payload becomes an empty body.
    Body,
    /// Wrapped as `{"Patch": payload}`.
    Patch,
    /// Flattened into the query string; no body.
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireRule {
    pub method: HttpMethod,
    pub override_get: bool,
    pub envelope: Envelope,
}

impl Verb {
    /// The wire rule for this verb. One arm per row of the dialect table.
    pub const fn rule(self) -> WireRule {
        match self {
            Verb::Fetch => WireRule {
                method: HttpMethod::Post,
                override_get: true,
                envelope: Envelope::Body,
            },
            Verb::FetchQuery => WireRule {
                method: HttpMethod::Get,
                override_get: false,
                envelope: Envelope::Query,
            },
            Verb::Mutate => WireRule {
                method: HttpMethod::Post,
                override_get: false,
                envelope: Envelope::Body,
            },
            Verb::PartialUpdate => WireRule {
                method: HttpMethod::Patch,
                override_get: false,
                envelope: Envelope::Patch,
            },
        }
    }
}

impl Shape {
    pub fn suffix(self) -> &'static str {
        match self {
            Shape::Single => "",
            Shape::Batch => BATCH_SUFFIX,
        }
    }
}

/// Build the wire request for `verb` against `endpoint`.
pub fn build_request(
    config: &ServiceConfig,
    verb: Verb,
    shape: Shape,
    endpoint: &str,
    payload: Option<Value>,
) -> Result<WireRequest, ServiceError> {
    let rule = verb.rule();
    let url = format!(
        "{}{API_PREFIX}{}{}",
        config.base_url(),
        endpoint.trim_start_matches('/'),
        shape.suffix()
    );

    let (url, body) = match rule.envelope {
        Envelope::Body => (url, Some(encode_body(payload.as_ref())?)),
        Envelope::Patch => {
            let patch = payload.unwrap_or(Value::Null);
            (url, Some(encode_body(Some(&json!({ "Patch": patch })))?))
        }
        Envelope::Query => (append_query(&url, payload.as_ref())?, None),
    };

    let mut headers = vec![
        (HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON.to_string()),
        (HEADER_AUTHORIZATION.to_string(), config.bearer()),
    ];
    if let Some(body) = &body {
        headers.push((HEADER_CONTENT_LENGTH.to_string(), body.len().to_string()));
    }
    if rule.override_get {
        headers.push((
            HEADER_METHOD_OVERRIDE.to_string(),
            HttpMethod::Get.as_str().to_string(),
        ));
    }

    Ok(WireRequest {
        method: rule.method,
        url,
        headers,
        body,
    })
}

/// Absent payloads are sent as an empty string, not omitted.
fn encode_body(payload: Option<&Value>) -> Result<String, ServiceError> {
    match payload {
        None => Ok(String::new()),
        Some(value) => {
            serde_json::to_string(value).map_err(|e| ServiceError::InvalidRequest(e.to_string()))
        }
    }
}

fn append_query(url: &str, params: Option<&Value>) -> Result<String, ServiceError> {
    let map = match params {
        None | Some(Value::Null) => return Ok(url.to_string()),
        Some(Value::Object(map)) if map.is_empty() => return Ok(url.to_string()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ServiceError::InvalidRequest(format!(
                "query parameters must be a JSON object, got {other}"
            )))
        }
    };

    let mut parsed = Url::parse(url)
        .map_err(|e| ServiceError::InvalidRequest(format!("invalid url `{url}`: {e}")))?;
    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in map {
            pairs.append_pair(key, &query_value(value));
        }
    }
    Ok(parsed.to_string())
}

/// Strings are sent bare; everything else in its JSON text form.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
