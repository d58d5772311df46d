//! In-memory stand-in for the single-endpoint REST service.
//!
//! # Design
//! Every operation is a form POST to `/service/{version}/rest.php` carrying
//! `method`, `input_type`, `response_type` and a JSON `rest_data` string.
//! Users, sessions and stored records live in `MockState`. Answers are JSON
//! payloads, or `{name, number, description}` fault triples the way the real
//! service reports errors. Test hooks on `MockState` force HTTP error
//! statuses, non-JSON bodies and session expiry, and every call is recorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};
use uuid::Uuid;

pub const INVALID_LOGIN: i64 = 10;
pub const INVALID_SESSION: i64 = 11;
pub const UNSUPPORTED_CALL: i64 = 1000;

/// Form body of one call.
#[derive(Debug, Deserialize)]
pub struct RestCall {
    pub method: String,
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub rest_data: String,
}

/// A call as the server saw it, `rest_data` decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub rest_data: Value,
}

struct User {
    id: String,
    password_md5: String,
}

#[derive(Clone)]
struct Record {
    id: String,
    fields: Map<String, Value>,
}

#[derive(Default)]
struct Store {
    /// session id -> user name
    sessions: HashMap<String, String>,
    /// module name -> records in insertion order
    records: HashMap<String, Vec<Record>>,
}

pub struct MockState {
    users: HashMap<String, User>,
    store: Mutex<Store>,
    calls: Mutex<Vec<RecordedCall>>,
    forced_status: Mutex<Option<u16>>,
    malformed: AtomicBool,
}

pub type SharedState = Arc<MockState>;

impl Default for MockState {
    fn default() -> Self {
        Self::new()
            .with_user("alice", "u-1", "secret")
            .with_user("bob", "u-2", "hunter2")
    }
}

impl MockState {
    /// State with no users.
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            store: Mutex::new(Store::default()),
            calls: Mutex::new(Vec::new()),
            forced_status: Mutex::new(None),
            malformed: AtomicBool::new(false),
        }
    }

    pub fn with_user(mut self, name: &str, id: &str, password: &str) -> Self {
        self.users.insert(
            name.to_string(),
            User {
                id: id.to_string(),
                password_md5: hex::encode(Md5::digest(password.as_bytes())),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Answer every call with this HTTP status until cleared with `None`.
    pub fn fail_with_status(&self, status: Option<u16>) {
        *lock(&self.forced_status) = status;
    }

    /// Answer every call with a non-JSON body.
    pub fn respond_malformed(&self, enabled: bool) {
        self.malformed.store(enabled, Ordering::SeqCst);
    }

    /// Forget every open session.
    pub fn expire_sessions(&self) {
        lock(&self.store).sessions.clear();
    }

    pub fn open_sessions(&self) -> usize {
        lock(&self.store).sessions.len()
    }

    fn record(&self, method: &str, rest_data: &Value) {
        lock(&self.calls).push(RecordedCall {
            method: method.to_string(),
            rest_data: rest_data.clone(),
        });
    }

    fn handle(&self, method: &str, data: &Value) -> Value {
        match method {
            "login" => return self.login(data),
            "get_server_info" => {
                return json!({"flavor": "CE", "version": "6.5.26", "gmt_time": "2026-01-01 00:00:00"})
            }
            _ => {}
        }

        let session = data.get("session").and_then(Value::as_str).unwrap_or_default();
        let mut store = lock(&self.store);
        let Some(user_name) = store.sessions.get(session).cloned() else {
            return fault("Invalid Session ID", INVALID_SESSION, "The session ID is invalid");
        };

        match method {
            "logout" => {
                store.sessions.remove(session);
                info!(user = %user_name, "logout");
                Value::Null
            }
            "get_user_id" => json!(self.users.get(&user_name).map(|u| u.id.as_str())),
            "set_entry" => set_entry(&mut store, data),
            "get_entry" => get_entry(&store, data),
            "get_entry_list" => get_entry_list(&store, data),
            "get_entries_count" => {
                let module = str_param(data, "module_name");
                let count = store.records.get(module).map_or(0, Vec::len);
                json!({"result_count": count})
            }
            other => fault(
                "Unsupported Call",
                UNSUPPORTED_CALL,
                &format!("{other} is not implemented by the mock server"),
            ),
        }
    }

    fn login(&self, data: &Value) -> Value {
        let auth = &data["user_auth"];
        let name = auth["user_name"].as_str().unwrap_or_default();
        let password = auth["password"].as_str().unwrap_or_default();

        match self.users.get(name) {
            Some(user) if user.password_md5 == password => {
                let session = Uuid::new_v4().simple().to_string();
                lock(&self.store).sessions.insert(session.clone(), name.to_string());
                info!(user = name, "login");
                json!({
                    "id": session,
                    "module_name": "Users",
                    "name_value_list": {
                        "user_id": {"name": "user_id", "value": user.id},
                        "user_name": {"name": "user_name", "value": name},
                    }
                })
            }
            _ => fault(
                "Invalid Login",
                INVALID_LOGIN,
                "Login attempt failed please check the username and password",
            ),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn fault(name: &str, number: i64, description: &str) -> Value {
    json!({"name": name, "number": number, "description": description})
}

fn str_param<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Accept `[{name, value}]`, `{name: {name, value}}` or `{name: value}`.
fn flatten_fields(value: &Value) -> Map<String, Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?;
                Some((name.to_string(), item.get("value").cloned().unwrap_or(Value::Null)))
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(k, v)| {
                let v = v.get("value").cloned().unwrap_or_else(|| v.clone());
                (k.clone(), v)
            })
            .collect(),
        _ => Map::new(),
    }
}

fn entry_json(module: &str, record: &Record) -> Value {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!({"name": "id", "value": record.id}));
    for (name, value) in &record.fields {
        fields.insert(name.clone(), json!({"name": name, "value": value}));
    }
    json!({"id": record.id, "module_name": module, "name_value_list": fields})
}

fn set_entry(store: &mut Store, data: &Value) -> Value {
    let module = str_param(data, "module_name").to_string();
    let mut fields = flatten_fields(&data["name_value_list"]);
    let id = match fields.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };

    let records = store.records.entry(module.clone()).or_default();
    match records.iter_mut().find(|r| r.id == id) {
        Some(existing) => existing.fields.extend(fields),
        None => records.push(Record {
            id: id.clone(),
            fields,
        }),
    }
    debug!(module = %module, id = %id, "set_entry");
    json!({"id": id})
}

fn get_entry(store: &Store, data: &Value) -> Value {
    let module = str_param(data, "module_name");
    let id = str_param(data, "id");
    let entries: Vec<Value> = store
        .records
        .get(module)
        .and_then(|records| records.iter().find(|r| r.id == id))
        .map(|record| entry_json(module, record))
        .into_iter()
        .collect();
    json!({"entry_list": entries, "relationship_list": []})
}

fn get_entry_list(store: &Store, data: &Value) -> Value {
    let module = str_param(data, "module_name");
    let records = store.records.get(module).map(Vec::as_slice).unwrap_or_default();
    let offset = data["offset"].as_u64().unwrap_or(0) as usize;
    let limit = data["max_results"].as_u64().map_or(records.len(), |n| n as usize);

    let page: Vec<Value> = records
        .iter()
        .skip(offset)
        .take(limit)
        .map(|record| entry_json(module, record))
        .collect();
    json!({
        "result_count": page.len(),
        "total_count": records.len(),
        "next_offset": offset + page.len(),
        "entry_list": page,
        "relationship_list": [],
    })
}

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::default()))
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .route("/service/{version}/rest.php", post(rest))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn rest(State(state): State<SharedState>, Form(call): Form<RestCall>) -> Response {
    let rest_data = if call.rest_data.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_str(&call.rest_data) {
            Ok(value) => value,
            Err(_) => {
                return Json(fault("Invalid Call", UNSUPPORTED_CALL, "rest_data is not valid JSON"))
                    .into_response()
            }
        }
    };
    state.record(&call.method, &rest_data);
    debug!(method = %call.method, "call");

    let forced = *lock(&state.forced_status);
    if let Some(status) = forced {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "internal error").into_response();
    }
    if state.malformed.load(Ordering::SeqCst) {
        return (StatusCode::OK, "<b>Fatal error</b>: Allowed memory size exhausted").into_response();
    }
    if call.input_type != "JSON" || call.response_type != "JSON" {
        return Json(fault(
            "Invalid Call",
            UNSUPPORTED_CALL,
            "only JSON input and response types are supported",
        ))
        .into_response();
    }

    Json(state.handle(&call.method, &rest_data)).into_response()
}
