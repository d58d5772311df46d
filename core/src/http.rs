//! Wire format for the single-endpoint form POST protocol.
//!
//! # Design
//! Requests and responses are described as plain data. `FormFields` is the
//! ordered set of form fields one operation sends; `HttpResponse` is whatever
//! came back. `decode_response` turns a response into a JSON tree or a
//! classified `TransportError` without touching the network, so every
//! transport implementation shares the same classification rules.

use serde_json::Value;

use crate::error::TransportError;

/// Encoding tag sent as both `input_type` and `response_type`.
pub const JSON_ENCODING: &str = "JSON";

/// Ordered form fields of one POST.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields for one remote operation: `method`, `input_type`,
    /// `response_type` and the JSON-encoded `rest_data`.
    pub fn for_operation(operation: &str, rest_data: &Value) -> Self {
        let mut fields = Self::new();
        fields.push("method", operation);
        fields.push("input_type", JSON_ENCODING);
        fields.push("response_type", JSON_ENCODING);
        fields.push("rest_data", rest_data.to_string());
        fields
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Classify a response: 4xx/5xx is `ServerRejected`, a body that does not
/// parse as JSON is `MalformedResponse`, anything else is the decoded tree.
pub fn decode_response(response: HttpResponse) -> Result<Value, TransportError> {
    if response.status >= 400 {
        return Err(TransportError::ServerRejected {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))
}
