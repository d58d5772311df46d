//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port with its own state, then
//! drives `SugarClient` over real HTTP through `HttpConnector`. The shared
//! `MockState` handle lets a test force failures and count what reached the
//! server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mock_server::MockState;
use serde_json::json;
use sugar_rest_core::{
    name_value_list, name_value_map, parameters, ApiError, ClientConfig, EntryListQuery,
    EntryPointBuilder, HttpConnector, SugarClient,
};

/// Start a mock server on a random port and return its address and state.
fn start_server() -> (String, Arc<MockState>) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = Arc::new(MockState::default());
    let server_state = Arc::clone(&state);
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, server_state).await
        })
        .unwrap();
    });

    (addr.to_string(), state)
}

fn client_for(host: &str) -> SugarClient {
    let mut entry_point = EntryPointBuilder::new("http://{host}/service/{version}/rest.php");
    entry_point.set_placeholder("host", host);
    entry_point.set_placeholder("version", "v4_1");
    SugarClient::new(HttpConnector::with_timeout(Duration::from_secs(5)), entry_point)
}

#[test]
fn login_records_session_and_user() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);

    assert!(client.login_as("alice", "secret"));
    assert!(client.session_id().is_some());
    assert_eq!(client.user_id(), Some("u-1"));
    assert!(client.was_successful());
    assert_eq!(client.last_error_message(), "");

    let login = &state.calls()[0];
    assert_eq!(login.method, "login");
    assert_ne!(login.rest_data["user_auth"]["password"], "secret");
    assert_eq!(login.rest_data["user_auth"]["password"].as_str().unwrap().len(), 32);
}

#[test]
fn valid_session_skips_the_network() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);

    assert!(client.login_as("alice", "secret"));
    assert!(client.login());
    assert!(client.login_as("alice", "secret"));
    assert_eq!(state.call_count(), 1);
}

#[test]
fn switching_user_forces_fresh_login() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);

    assert!(client.login_as("alice", "secret"));
    client.set_auth("bob", "hunter2");
    assert!(!client.is_session_valid());

    assert!(client.login());
    assert_eq!(client.user_id(), Some("u-2"));
    assert_eq!(state.call_count(), 2);
}

#[test]
fn http_500_on_login_leaves_logged_out() {
    let (addr, state) = start_server();
    state.fail_with_status(Some(500));
    let mut client = client_for(&addr);

    assert!(!client.login_as("alice", "secret"));
    assert!(client.session_id().is_none());
    assert!(!client.was_successful());
    assert!(!client.last_error_message().is_empty());
    assert!(matches!(
        client.last_error(),
        Some(ApiError::ServerRejected { status: 500, .. })
    ));
}

#[test]
fn wrong_password_is_authentication_failure() {
    let (addr, _state) = start_server();
    let mut client = client_for(&addr);

    assert!(!client.login_as("alice", "wrong"));
    assert!(matches!(client.last_error(), Some(ApiError::AuthenticationFailed(_))));
    assert!(!client.is_session_valid());
}

#[test]
fn malformed_body_is_classified() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);
    assert!(client.login_as("alice", "secret"));

    state.respond_malformed(true);
    let result = client.invoke("get_entry", parameters(json!({"module_name": "Accounts", "id": "x"})));
    assert!(matches!(result, Err(ApiError::MalformedResponse(_))));
    assert!(!client.last_error_message().is_empty());

    state.respond_malformed(false);
    client.get_user_id().unwrap();
    assert!(client.was_successful());
    assert_eq!(client.last_error_message(), "");
}

#[test]
fn records_roundtrip() {
    let (addr, _state) = start_server();
    let mut client = client_for(&addr);
    assert!(client.login_as("bob", "hunter2"));

    let fields = name_value_list([("name", json!("Acme")), ("industry", json!("Retail"))]);
    let created = client.set_entry("Accounts", fields, false).unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let fetched = client
        .get_entry("Accounts", &id, &["name", "industry"], &json!(null), false)
        .unwrap();
    let record = name_value_map(&fetched["entry_list"][0]["name_value_list"]);
    assert_eq!(record["name"], "Acme");
    assert_eq!(record["industry"], "Retail");

    let listed = client
        .get_entry_list("Accounts", &EntryListQuery::default())
        .unwrap();
    assert_eq!(listed["result_count"], 1);

    let count = client.get_entries_count("Accounts", "", false).unwrap();
    assert_eq!(count["result_count"], 1);
}

#[test]
fn expired_session_is_dropped() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);
    assert!(client.login_as("alice", "secret"));

    state.expire_sessions();
    let err = client.get_user_id().unwrap_err();
    assert!(err.is_session_error());
    assert!(!client.is_session_valid());

    assert!(client.login());
    assert_eq!(client.get_user_id().unwrap(), "u-1");
}

#[test]
fn logout_closes_remote_session() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);
    assert!(client.login_as("alice", "secret"));
    assert_eq!(state.open_sessions(), 1);

    client.logout();
    assert_eq!(state.open_sessions(), 0);
    assert!(client.session_id().is_none());
    assert!(client.user_id().is_none());

    assert!(client.login());
    assert_eq!(state.open_sessions(), 1);
}

#[test]
fn logout_clears_local_state_when_server_fails() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);
    assert!(client.login_as("alice", "secret"));

    state.fail_with_status(Some(503));
    client.logout();
    assert!(client.session_id().is_none());
    assert!(!client.is_session_valid());
}

#[test]
fn placeholder_change_moves_to_new_server() {
    let (first_addr, first) = start_server();
    let (second_addr, second) = start_server();
    let mut client = client_for(&first_addr);

    client.get_server_info().unwrap();
    client.set_template_placeholder("host", second_addr.as_str());
    client.get_server_info().unwrap();

    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 1);
    assert_eq!(
        client.dispatcher().bound_entry_point(),
        Some(format!("http://{second_addr}/service/v4_1/rest.php").as_str())
    );
}

#[test]
fn closed_port_is_network_unavailable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut client = client_for(&addr.to_string());

    let err = client.get_server_info().unwrap_err();
    assert!(matches!(err, ApiError::NetworkUnavailable(_)));
    assert!(!client.was_successful());
}

#[test]
fn silent_server_times_out_as_network_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        // Hold the connection open without ever answering.
        let (_stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_secs(10));
    });

    let mut entry_point = EntryPointBuilder::new("http://{host}/service/v4_1/rest.php");
    entry_point.set_placeholder("host", addr.to_string());
    let mut client =
        SugarClient::new(HttpConnector::with_timeout(Duration::from_secs(1)), entry_point);

    let started = Instant::now();
    let err = client.get_server_info().unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, ApiError::NetworkUnavailable(_)));
    assert!(!client.was_successful());
}

#[test]
fn client_from_config() {
    let (addr, _state) = start_server();
    let config = ClientConfig::from_vars([
        ("SUGAR_PLACEHOLDER_PROTOCOL", "http"),
        ("SUGAR_PLACEHOLDER_HOST", addr.as_str()),
        ("SUGAR_TIMEOUT_SECS", "5"),
    ])
    .unwrap();
    let mut client = SugarClient::from_config(&config);

    assert!(client.login_as("alice", "secret"));
    assert_eq!(client.get_user_id().unwrap(), "u-1");
}

#[test]
fn unresolved_placeholder_never_reaches_network() {
    let (addr, state) = start_server();
    let mut client = client_for(&addr);
    client.set_entry_point_template("http://{host}/{tenant}/rest.php");

    assert!(!client.login_as("alice", "secret"));
    assert!(matches!(client.last_error(), Some(ApiError::Configuration(_))));
    assert_eq!(state.call_count(), 0);
}
