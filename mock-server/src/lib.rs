//! In-memory stand-in for the remote CRM API.
//!
//! Speaks the same dialect as the real host: every endpoint lives under
//! `/api/json/reply/`, reads with a JSON body are POSTs carrying
//! `X-HTTP-METHOD-OVERRIDE: GET`, batch endpoints end in `[]`, partial updates
//! are PATCHes with a `{"Patch": ...}` envelope, and authorization failures
//! come back as HTTP 500.

use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_TOKEN: &str = "test-token";
pub const ACCESS_DENIED_BODY: &str =
    r#"{"ResponseStatus":{"ErrorCode":"Forbidden","Message":"You do not have access to this endpoint"}}"#;
const OVERRIDE_HEADER: &str = "x-http-method-override";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewContact {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct PatchEnvelope<T> {
    #[serde(rename = "Patch")]
    patch: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdLookup {
    id: i64,
}

#[derive(Clone, Debug)]
pub struct MockConfig {
    pub token: String,
    /// How long the `Slow` endpoint waits before answering.
    pub slow_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            slow_delay: Duration::from_secs(5),
        }
    }
}

struct Store {
    contacts: BTreeMap<i64, Contact>,
    next_id: i64,
}

impl Store {
    fn seeded() -> Self {
        let contacts: BTreeMap<i64, Contact> = [
            (7, "Ada Lovelace", "ada@example.com"),
            (8, "Grace Hopper", "grace@example.com"),
        ]
        .into_iter()
        .map(|(id, name, email)| {
            (
                id,
                Contact {
                    id,
                    name: name.to_string(),
                    email: email.to_string(),
                },
            )
        })
        .collect();
        Self {
            contacts,
            next_id: 100,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    config: Arc<MockConfig>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::seeded())),
        config: Arc::new(config),
    };
    Router::new()
        .route("/api/json/reply/{*endpoint}", any(dispatch))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn text(status: StatusCode, body: &str) -> Response {
    (status, body.to_string()).into_response()
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(endpoint): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let expected = format!("Bearer {}", state.config.token);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        tracing::warn!(%endpoint, "rejecting request without valid bearer token");
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let read_override = headers
        .get(OVERRIDE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("GET"));
    tracing::info!(%method, %endpoint, read_override, "mock crm request");

    let (resource, id) = match endpoint.split_once('/') {
        Some((resource, id)) => (resource, Some(id)),
        None => (endpoint.as_str(), None),
    };

    match (resource, id, &method, read_override) {
        ("Echo", None, _, _) => echo(&method, read_override, &query, &headers, &body),
        ("Secret", None, _, _) => text(StatusCode::INTERNAL_SERVER_ERROR, ACCESS_DENIED_BODY),
        ("Slow", None, _, _) => {
            tokio::time::sleep(state.config.slow_delay).await;
            Json(json!({ "Ok": true })).into_response()
        }
        ("Malformed", None, _, _) => text(StatusCode::OK, "{not json"),
        ("Empty", None, _, _) => text(StatusCode::OK, ""),
        ("Contacts", None, &Method::GET, false) => {
            let store = state.store.read().await;
            Json(filter_contacts(&store, query.get("Name").map(String::as_str))).into_response()
        }
        ("Contacts", None, &Method::POST, true) => search_contacts(&state, &body).await,
        ("Contacts", None, &Method::POST, false) => create_contact(&state, &body).await,
        ("Contacts[]", None, &Method::POST, true) => batch_contacts(&state, &body).await,
        ("Contacts", Some(id), &Method::PATCH, false) => patch_contact(&state, id, &body).await,
        _ => text(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn echo(
    method: &Method,
    read_override: bool,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: &str,
) -> Response {
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({
        "Method": method.as_str(),
        "Override": read_override,
        "Query": query,
        "Body": body,
        "ContentLength": content_length,
    }))
    .into_response()
}

fn filter_contacts(store: &Store, name: Option<&str>) -> Vec<Contact> {
    store
        .contacts
        .values()
        .filter(|c| name.map_or(true, |n| c.name == n))
        .cloned()
        .collect()
}

async fn search_contacts(state: &AppState, body: &str) -> Response {
    let name = if body.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(body) {
            Ok(filter) => filter.get("Name").and_then(Value::as_str).map(str::to_string),
            Err(_) => return text(StatusCode::BAD_REQUEST, "Invalid JSON body"),
        }
    };
    let store = state.store.read().await;
    Json(filter_contacts(&store, name.as_deref())).into_response()
}

async fn create_contact(state: &AppState, body: &str) -> Response {
    let Ok(input) = serde_json::from_str::<NewContact>(body) else {
        return text(StatusCode::BAD_REQUEST, "Invalid contact");
    };
    let mut store = state.store.write().await;
    let id = store.next_id;
    store.next_id += 1;
    let contact = Contact {
        id,
        name: input.name,
        email: input.email,
    };
    store.contacts.insert(id, contact.clone());
    Json(contact).into_response()
}

async fn batch_contacts(state: &AppState, body: &str) -> Response {
    let Ok(lookups) = serde_json::from_str::<Vec<IdLookup>>(body) else {
        return text(StatusCode::BAD_REQUEST, "Batch endpoints require an array body");
    };
    let store = state.store.read().await;
    let found: Vec<Contact> = lookups
        .iter()
        .filter_map(|lookup| store.contacts.get(&lookup.id).cloned())
        .collect();
    Json(found).into_response()
}

async fn patch_contact(state: &AppState, id: &str, body: &str) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return text(StatusCode::NOT_FOUND, "Not found");
    };
    let Ok(envelope) = serde_json::from_str::<PatchEnvelope<ContactPatch>>(body) else {
        return text(StatusCode::BAD_REQUEST, "Missing Patch envelope");
    };
    let mut store = state.store.write().await;
    let Some(contact) = store.contacts.get_mut(&id) else {
        return text(StatusCode::NOT_FOUND, "Not found");
    };
    if let Some(name) = envelope.patch.name {
        contact.name = name;
    }
    if let Some(email) = envelope.patch.email {
        contact.email = email;
    }
    StatusCode::NO_CONTENT.into_response()
}
