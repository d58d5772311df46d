//! POST transport bound to a single entry point URL.
//!
//! `Connector` builds a `Transport` for one URL; the transport never rebinds.
//! The dispatcher owns the transport and asks the connector for a fresh one
//! whenever the entry point changes.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;
use crate::http::{decode_response, FormFields, HttpResponse};

/// Sends one form POST per call and returns the decoded JSON body.
pub trait Transport {
    /// URL this transport was bound to at construction.
    fn entry_point(&self) -> &str;

    /// Perform exactly one round trip. No retries.
    fn post(&self, fields: &FormFields) -> Result<Value, TransportError>;
}

/// Factory for transports bound to a given URL.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, entry_point: &str) -> Self::Transport;
}

/// Builds `HttpTransport`s sharing one per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, entry_point: &str) -> HttpTransport {
        HttpTransport::new(entry_point, self.timeout)
    }
}

/// Live HTTP transport backed by a `ureq` agent.
///
/// Status codes are returned as data rather than `Err` so that
/// `decode_response` owns status interpretation. An expired timeout surfaces
/// as `NetworkUnavailable`.
pub struct HttpTransport {
    entry_point: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(entry_point: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            entry_point: entry_point.to_string(),
            timeout,
            agent,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("entry_point", &self.entry_point)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn post(&self, fields: &FormFields) -> Result<Value, TransportError> {
        let mut response = self
            .agent
            .post(self.entry_point.as_str())
            .send_form(fields.iter())
            .map_err(classify_ureq_error)?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(classify_ureq_error)?;

        decode_response(HttpResponse { status, body })
    }
}

fn classify_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(status) => TransportError::ServerRejected {
            status,
            body: String::new(),
        },
        ureq::Error::Timeout(which) => {
            TransportError::NetworkUnavailable(format!("request timed out ({which:?})"))
        }
        other => TransportError::NetworkUnavailable(other.to_string()),
    }
}
