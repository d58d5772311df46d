//! The single chokepoint every remote operation passes through.
//!
//! # Design
//! `ApiDispatcher` owns the entry point builder and the transport bound to
//! its rendered URL. The transport is built lazily and remembered together
//! with the builder generation it was built at; a generation mismatch on the
//! next call discards it and binds a new one.
//!
//! Every `invoke` overwrites the last-error slot: cleared on success, set to
//! the classified failure otherwise. Failures are always returned as values.

use serde_json::Value;
use tracing::{debug, warn};

use crate::endpoint::EntryPointBuilder;
use crate::error::ApiError;
use crate::http::FormFields;
use crate::transport::{Connector, Transport};
use crate::types::{Fault, Parameters, INVALID_LOGIN, INVALID_SESSION};

/// Operation name whose faults always mean rejected credentials.
pub const LOGIN_OPERATION: &str = "login";

/// Whether a call carries the session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Sent without a session: login and server discovery.
    Anonymous,
    /// `session` is merged in as the first parameter. `None` means no
    /// session is open, and the call fails without touching the network.
    Session(Option<&'a str>),
}

struct BoundTransport<T> {
    generation: u64,
    transport: T,
}

pub struct ApiDispatcher<C: Connector> {
    connector: C,
    entry_point: EntryPointBuilder,
    bound: Option<BoundTransport<C::Transport>>,
    last_error: Option<ApiError>,
}

impl<C: Connector> ApiDispatcher<C> {
    pub fn new(connector: C, entry_point: EntryPointBuilder) -> Self {
        Self {
            connector,
            entry_point,
            bound: None,
            last_error: None,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn entry_point(&self) -> &EntryPointBuilder {
        &self.entry_point
    }

    pub fn set_entry_point_template(&mut self, template: impl Into<String>) {
        self.entry_point.set_template(template);
    }

    pub fn set_template_placeholder(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entry_point.set_placeholder(name, value);
    }

    /// URL of the currently bound transport, if one is bound and still
    /// matches the entry point.
    pub fn bound_entry_point(&self) -> Option<&str> {
        self.bound
            .as_ref()
            .filter(|bound| bound.generation == self.entry_point.generation())
            .map(|bound| bound.transport.entry_point())
    }

    /// Send one operation and classify the outcome.
    pub fn invoke(
        &mut self,
        operation: &str,
        parameters: Parameters,
        scope: Scope<'_>,
    ) -> Result<Value, ApiError> {
        let outcome = self.exchange(operation, parameters, scope);
        match &outcome {
            Ok(_) => self.last_error = None,
            Err(err) => {
                warn!(operation, error = %err, "remote operation failed");
                self.last_error = Some(err.clone());
            }
        }
        outcome
    }

    /// Overwrite the last error with a failure found while interpreting a
    /// payload the transport accepted.
    pub fn record_failure(&mut self, err: ApiError) {
        warn!(error = %err, "remote operation failed");
        self.last_error = Some(err);
    }

    /// Mark an operation satisfied without a round trip as successful.
    pub fn record_success(&mut self) {
        self.last_error = None;
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Message of the most recent failure, or an empty string.
    pub fn last_error_message(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn was_successful(&self) -> bool {
        self.last_error.is_none()
    }

    fn exchange(
        &mut self,
        operation: &str,
        parameters: Parameters,
        scope: Scope<'_>,
    ) -> Result<Value, ApiError> {
        let parameters = match scope {
            Scope::Anonymous => parameters,
            Scope::Session(Some(session_id)) => with_session(session_id, parameters),
            Scope::Session(None) => {
                return Err(ApiError::SessionExpired(format!(
                    "no session is open for `{operation}`"
                )))
            }
        };

        let transport = self.transport()?;
        debug!(operation, url = transport.entry_point(), "dispatching");
        let fields = FormFields::for_operation(operation, &Value::Object(parameters));
        let payload = transport.post(&fields)?;
        classify(operation, payload)
    }

    fn transport(&mut self) -> Result<&C::Transport, ApiError> {
        let generation = self.entry_point.generation();
        let bound = match self.bound.take() {
            Some(bound) if bound.generation == generation => bound,
            stale => {
                if let Some(stale) = stale {
                    debug!(
                        url = stale.transport.entry_point(),
                        "entry point changed, discarding transport"
                    );
                }
                let url = self.entry_point.render()?;
                debug!(url, generation, "binding transport");
                BoundTransport {
                    generation,
                    transport: self.connector.connect(url),
                }
            }
        };
        Ok(&self.bound.insert(bound).transport)
    }
}

/// Put `session` first; the server binds parameters by position.
fn with_session(session_id: &str, parameters: Parameters) -> Parameters {
    let mut merged = Parameters::with_capacity(parameters.len() + 1);
    merged.insert("session".to_string(), Value::String(session_id.to_string()));
    merged.extend(parameters.into_iter().filter(|(key, _)| key != "session"));
    merged
}

fn classify(operation: &str, payload: Value) -> Result<Value, ApiError> {
    let Some(fault) = Fault::from_payload(&payload) else {
        return Ok(payload);
    };
    if operation == LOGIN_OPERATION || fault.number == INVALID_LOGIN {
        return Err(ApiError::AuthenticationFailed(fault.to_string()));
    }
    if fault.number == INVALID_SESSION {
        return Err(ApiError::SessionExpired(fault.to_string()));
    }
    Err(ApiError::ServerRejected {
        status: 200,
        message: fault.to_string(),
    })
}
