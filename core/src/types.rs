//! Payload shapes shared by every remote operation.
//!
//! # Design
//! Responses are kept as untyped `serde_json::Value` trees; only the pieces
//! the client itself must understand get a type here: the fault triple the
//! server uses to report errors, and the `{name, value}` list convention used
//! for record fields in both directions.

use std::fmt;

use serde_json::{json, Map, Value};

/// Ordered parameter mapping sent as `rest_data`. The server binds entries by
/// position, so insertion order is significant.
pub type Parameters = Map<String, Value>;

/// Fault number the server uses for rejected credentials.
pub const INVALID_LOGIN: i64 = 10;

/// Fault number the server uses for an unknown or expired session id.
pub const INVALID_SESSION: i64 = 11;

/// Error triple carried in the body of an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub name: String,
    pub number: i64,
    pub description: String,
}

impl Fault {
    /// Recognise a fault payload: an object holding `name`, `number` and
    /// `description`, with a numeric (or numeric string) `number`.
    pub fn from_payload(payload: &Value) -> Option<Fault> {
        let object = payload.as_object()?;
        let number = match object.get("number")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Fault {
            name: text(object.get("name")?),
            number,
            description: text(object.get("description")?),
        })
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.number, self.description)
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Take the object out of a `json!({...})` literal.
pub fn parameters(value: Value) -> Parameters {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Build the `[{"name": .., "value": ..}, ..]` list the server expects for
/// record fields.
pub fn name_value_list<I, K, V>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Value::Array(
        pairs
            .into_iter()
            .map(|(name, value)| {
                let name: String = name.into();
                let value: Value = value.into();
                json!({"name": name, "value": value})
            })
            .collect(),
    )
}

/// Flatten a returned `name_value_list` into `name -> value`.
///
/// Accepts the list form, the object form keyed by name with
/// `{name, value}` entries, and plain objects. Anything else yields an empty
/// map.
pub fn name_value_map(value: &Value) -> Map<String, Value> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?;
                let value = item.get("value").cloned().unwrap_or(Value::Null);
                Some((name.to_string(), value))
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, entry)| {
                let value = match entry {
                    Value::Object(inner) if inner.contains_key("value") => inner["value"].clone(),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect(),
        _ => Map::new(),
    }
}
