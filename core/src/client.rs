//! Consumer-facing client: one dispatcher plus the session it authenticates.
//!
//! # Design
//! `SugarClient` is constructed explicitly and owns everything it mutates, so
//! independent sessions are independent values. Calls are strictly
//! sequential (`&mut self`); share across threads by giving each caller its
//! own client.
//!
//! Session-scoped calls get the current session id merged in by the
//! dispatcher. A failure that shows the server no longer accepts the session
//! drops it locally; nothing is retried automatically.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::dispatch::{ApiDispatcher, Scope};
use crate::endpoint::EntryPointBuilder;
use crate::error::ApiError;
use crate::session::SessionManager;
use crate::transport::{Connector, HttpConnector};
use crate::types::Parameters;

pub struct SugarClient<C: Connector = HttpConnector> {
    dispatcher: ApiDispatcher<C>,
    session: SessionManager,
}

impl SugarClient<HttpConnector> {
    /// Live HTTP client using the configured timeout.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_connector(HttpConnector::with_timeout(config.timeout()), config)
    }
}

impl<C: Connector> SugarClient<C> {
    pub fn with_connector(connector: C, config: &ClientConfig) -> Self {
        Self {
            dispatcher: ApiDispatcher::new(connector, config.entry_point()),
            session: SessionManager::new(
                config.application_name.clone(),
                config.protocol_version.clone(),
            ),
        }
    }

    pub fn new(connector: C, entry_point: EntryPointBuilder) -> Self {
        let defaults = ClientConfig::default();
        Self {
            dispatcher: ApiDispatcher::new(connector, entry_point),
            session: SessionManager::new(defaults.application_name, defaults.protocol_version),
        }
    }

    pub fn dispatcher(&self) -> &ApiDispatcher<C> {
        &self.dispatcher
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn entry_point(&self) -> &EntryPointBuilder {
        self.dispatcher.entry_point()
    }

    pub fn set_entry_point_template(&mut self, template: impl Into<String>) {
        self.dispatcher.set_entry_point_template(template);
    }

    pub fn set_template_placeholder(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.dispatcher.set_template_placeholder(name, value);
    }

    pub fn set_auth(&mut self, username: &str, password: &str) {
        self.session.set_auth(username, password);
    }

    /// Log in with the stored credentials; a no-op success while the
    /// current session is still valid.
    pub fn login(&mut self) -> bool {
        self.session.login(&mut self.dispatcher)
    }

    pub fn login_as(&mut self, username: &str, password: &str) -> bool {
        self.session.set_auth(username, password);
        self.login()
    }

    pub fn logout(&mut self) {
        self.session.logout(&mut self.dispatcher);
    }

    pub fn is_session_valid(&self) -> bool {
        self.session.is_session_valid()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.user_id()
    }

    /// Dispatch a session-scoped operation.
    pub fn invoke(&mut self, operation: &str, parameters: Parameters) -> Result<Value, ApiError> {
        let outcome = self.dispatcher.invoke(
            operation,
            parameters,
            Scope::Session(self.session.session_id()),
        );
        if let Err(err) = &outcome {
            self.session.observe(err);
        }
        outcome
    }

    /// Dispatch an operation that needs no session.
    pub fn invoke_anonymous(
        &mut self,
        operation: &str,
        parameters: Parameters,
    ) -> Result<Value, ApiError> {
        self.dispatcher.invoke(operation, parameters, Scope::Anonymous)
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.dispatcher.last_error()
    }

    pub fn last_error_message(&self) -> String {
        self.dispatcher.last_error_message()
    }

    pub fn was_successful(&self) -> bool {
        self.dispatcher.was_successful()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fake::ScriptedConnector;
    use crate::types::parameters;

    fn client() -> (ScriptedConnector, SugarClient<ScriptedConnector>) {
        let connector = ScriptedConnector::default();
        let mut entry_point = EntryPointBuilder::new("https://{host}/service/{version}/rest.php");
        entry_point.set_placeholder("host", "crm.example.com");
        entry_point.set_placeholder("version", "v4_1");
        (connector.clone(), SugarClient::new(connector, entry_point))
    }

    fn logged_in() -> (ScriptedConnector, SugarClient<ScriptedConnector>) {
        let (connector, mut c) = client();
        connector.reply_json(json!({
            "id": "sess-123",
            "name_value_list": {"user_id": {"value": "u-1"}}
        }));
        assert!(c.login_as("alice", "secret"));
        (connector, c)
    }

    #[test]
    fn login_scenario() {
        let (_, c) = logged_in();
        assert_eq!(c.session_id(), Some("sess-123"));
        assert_eq!(c.user_id(), Some("u-1"));
        assert!(c.was_successful());
        assert!(c.is_session_valid());
    }

    #[test]
    fn invoke_uses_current_session() {
        let (connector, mut c) = logged_in();
        connector.reply_json(json!("u-1"));

        let user = c.invoke("get_user_id", Parameters::new()).unwrap();
        assert_eq!(user, "u-1");
        assert_eq!(connector.posts()[1].rest_data(), json!({"session": "sess-123"}));
    }

    #[test]
    fn invoke_before_login_fails_locally() {
        let (connector, mut c) = client();
        let err = c.invoke("get_user_id", Parameters::new()).unwrap_err();
        assert!(err.is_session_error());
        assert_eq!(connector.post_count(), 0);
        assert!(!c.was_successful());
    }

    #[test]
    fn expired_session_is_dropped_then_relogin_works() {
        let (connector, mut c) = logged_in();
        connector
            .reply_json(json!({"name": "Invalid Session ID", "number": 11, "description": "expired"}))
            .reply_json(json!({"id": "sess-456", "name_value_list": {"user_id": {"value": "u-1"}}}))
            .reply_json(json!({"entry_list": []}));

        let err = c
            .invoke("get_entry_list", parameters(json!({"module_name": "Accounts"})))
            .unwrap_err();
        assert!(err.is_session_error());
        assert!(!c.is_session_valid());

        assert!(c.login());
        assert_eq!(c.session_id(), Some("sess-456"));
        c.invoke("get_entry_list", parameters(json!({"module_name": "Accounts"})))
            .unwrap();
        assert_eq!(connector.posts()[3].rest_data()["session"], "sess-456");
    }

    #[test]
    fn other_failures_keep_session() {
        let (connector, mut c) = logged_in();
        connector.reply(Err(crate::error::TransportError::NetworkUnavailable(
            "timeout".to_string(),
        )));

        assert!(c.invoke("get_user_id", Parameters::new()).is_err());
        assert!(c.is_session_valid());
    }

    #[test]
    fn anonymous_invoke_ignores_session() {
        let (connector, mut c) = logged_in();
        connector.reply_json(json!({"flavor": "CE"}));
        c.invoke_anonymous("get_server_info", Parameters::new()).unwrap();
        assert_eq!(connector.posts()[1].rest_data(), json!({}));
    }

    #[test]
    fn entry_point_changes_reach_the_transport() {
        let (connector, mut c) = logged_in();
        connector.reply_json(json!(null));
        c.set_template_placeholder("host", "eu.example.com");
        assert_eq!(c.entry_point().placeholder("host"), Some("eu.example.com"));
        c.invoke("get_user_id", Parameters::new()).unwrap();
        assert_eq!(connector.posts()[1].url, "https://eu.example.com/service/v4_1/rest.php");
    }

    #[test]
    fn config_settings_flow_into_login() {
        let connector = ScriptedConnector::default();
        let config = ClientConfig::from_json(
            r#"{"placeholders": {"protocol": "http", "host": "h", "version": "v4"},
                "application_name": "importer", "protocol_version": "2"}"#,
        )
        .unwrap();
        let mut c = SugarClient::with_connector(connector.clone(), &config);
        connector.reply_json(json!({"id": "s"}));
        assert!(c.login_as("alice", "secret"));

        let post = &connector.posts()[0];
        assert_eq!(post.url, "http://h/service/v4/rest.php");
        assert_eq!(post.rest_data()["application_name"], "importer");
        assert_eq!(post.rest_data()["user_auth"]["version"], "2");
    }
}
