//! Authentication state: credentials, session id and the login/logout flow.
//!
//! # Design
//! `SessionManager` owns the credentials and the session it opened with
//! them. It never talks to the network itself; `login` and `logout` take the
//! dispatcher explicitly, so a manager and its dispatcher form one
//! independent client with no shared global state.
//!
//! The clear-text password is hashed in `set_auth` and dropped; only the
//! digest is kept and transmitted.

use std::fmt;

use md5::{Digest, Md5};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::dispatch::{ApiDispatcher, Scope, LOGIN_OPERATION};
use crate::error::ApiError;
use crate::transport::Connector;
use crate::types::{name_value_map, parameters, Parameters};

/// Lowercase hex MD5 of the password, the form the server expects.
pub fn password_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password_digest: String,
    version: String,
    application_name: String,
}

impl Credentials {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    fn login_parameters(&self) -> Parameters {
        parameters(json!({
            "user_auth": {
                "user_name": self.username,
                "password": self.password_digest,
                "version": self.version,
            },
            "application_name": self.application_name,
            "name_value_list": [],
        }))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("version", &self.version)
            .field("application_name", &self.application_name)
            .finish_non_exhaustive()
    }
}

/// Session opened by a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    user_id: Option<String>,
    established_for: Option<String>,
}

impl SessionState {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.session_id.is_some()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    application_name: String,
    protocol_version: String,
    credentials: Option<Credentials>,
    state: SessionState,
}

impl SessionManager {
    pub fn new(application_name: impl Into<String>, protocol_version: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            protocol_version: protocol_version.into(),
            credentials: None,
            state: SessionState::default(),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.state.user_id()
    }

    /// Record credentials for the next login. Switching to a different user
    /// drops the current session.
    pub fn set_auth(&mut self, username: &str, password: &str) {
        let user_changed = self
            .credentials
            .as_ref()
            .map_or(true, |current| current.username != username);
        if user_changed && self.state.is_open() {
            info!(username, "credentials changed, dropping session");
            self.state.clear();
        }
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password_digest: password_digest(password),
            version: self.protocol_version.clone(),
            application_name: self.application_name.clone(),
        });
    }

    /// Local check: a session is open and was opened for the configured
    /// user. Never touches the network.
    pub fn is_session_valid(&self) -> bool {
        match (&self.credentials, &self.state.established_for) {
            (Some(credentials), Some(user)) => {
                self.state.is_open() && credentials.username == *user
            }
            _ => false,
        }
    }

    /// Log in with the stored credentials unless a valid session is already
    /// open. Returns whether a session is open afterwards; the dispatcher's
    /// last error agrees with the return value on every path.
    pub fn login<C: Connector>(&mut self, dispatcher: &mut ApiDispatcher<C>) -> bool {
        if self.is_session_valid() {
            debug!("session still valid, skipping login");
            dispatcher.record_success();
            return true;
        }
        self.state.clear();

        let Some(credentials) = self.credentials.clone() else {
            dispatcher.record_failure(ApiError::AuthenticationFailed(
                "no credentials have been set".to_string(),
            ));
            return false;
        };

        let reply = match dispatcher.invoke(
            LOGIN_OPERATION,
            credentials.login_parameters(),
            Scope::Anonymous,
        ) {
            Ok(reply) => reply,
            Err(_) => return false,
        };

        match parse_login_reply(&reply) {
            Ok((session_id, user_id)) => {
                info!(username = credentials.username(), user_id = user_id.as_deref(), "logged in");
                self.state = SessionState {
                    session_id: Some(session_id),
                    user_id,
                    established_for: Some(credentials.username),
                };
                true
            }
            Err(err) => {
                dispatcher.record_failure(err);
                false
            }
        }
    }

    /// Close the remote session if one is open, then clear local session
    /// state regardless of the remote outcome. Credentials are kept.
    pub fn logout<C: Connector>(&mut self, dispatcher: &mut ApiDispatcher<C>) {
        if let Some(session_id) = self.state.session_id.take() {
            let outcome = dispatcher.invoke(
                "logout",
                Parameters::new(),
                Scope::Session(Some(&session_id)),
            );
            if let Err(err) = outcome {
                warn!(error = %err, "remote logout failed, clearing local session anyway");
            }
            info!("logged out");
        }
        self.state.clear();
    }

    /// React to a failed session-scoped call.
    pub fn observe(&mut self, err: &ApiError) {
        if err.invalidates_session() && self.state.is_open() {
            info!(error = %err, "server no longer accepts session, dropping it");
            self.state.clear();
        }
    }
}

fn parse_login_reply(reply: &Value) -> Result<(String, Option<String>), ApiError> {
    let session_id = reply
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ApiError::MalformedResponse("login response carries no session id".to_string())
        })?;
    let user_id = reply
        .get("name_value_list")
        .map(name_value_map)
        .and_then(|fields| fields.get("user_id").and_then(Value::as_str).map(str::to_string));
    Ok((session_id.to_string(), user_id))
}
