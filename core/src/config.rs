//! Client configuration.
//!
//! All fields have defaults, so a JSON document or environment only needs to
//! name what differs. The default template needs a `host` placeholder before
//! it renders.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::endpoint::EntryPointBuilder;
use crate::error::ApiError;

pub const DEFAULT_TEMPLATE: &str = "{protocol}://{host}/service/{version}/rest.php";

const ENV_PREFIX: &str = "SUGAR_";
const ENV_PLACEHOLDER_PREFIX: &str = "SUGAR_PLACEHOLDER_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub entry_point_template: String,
    pub placeholders: BTreeMap<String, String>,
    pub timeout_secs: u64,
    pub application_name: String,
    /// Sent as `user_auth.version` on login.
    pub protocol_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let placeholders = [("protocol", "https"), ("version", "v4_1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entry_point_template: DEFAULT_TEMPLATE.to_string(),
            placeholders,
            timeout_secs: 30,
            application_name: "sugar-rest".to_string(),
            protocol_version: "1".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ApiError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `SUGAR_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs using the `SUGAR_*` names:
    /// `ENTRY_POINT_TEMPLATE`, `TIMEOUT_SECS`, `APPLICATION_NAME`,
    /// `PROTOCOL_VERSION`, and `PLACEHOLDER_<NAME>` per placeholder.
    /// Unrelated variables are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(name) = key.strip_prefix(ENV_PLACEHOLDER_PREFIX) {
                config.placeholders.insert(name.to_ascii_lowercase(), value.into());
                continue;
            }
            match key.strip_prefix(ENV_PREFIX) {
                Some("ENTRY_POINT_TEMPLATE") => config.entry_point_template = value.into(),
                Some("APPLICATION_NAME") => config.application_name = value.into(),
                Some("PROTOCOL_VERSION") => config.protocol_version = value.into(),
                Some("TIMEOUT_SECS") => {
                    let raw: String = value.into();
                    config.timeout_secs = raw.trim().parse().map_err(|_| {
                        ApiError::Configuration(format!("SUGAR_TIMEOUT_SECS is not a number: {raw}"))
                    })?;
                }
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// A zero timeout would fail every request before it is sent.
    fn validate(&self) -> Result<(), ApiError> {
        if self.timeout_secs == 0 {
            return Err(ApiError::Configuration(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn entry_point(&self) -> EntryPointBuilder {
        let mut builder = EntryPointBuilder::new(self.entry_point_template.clone());
        for (name, value) in &self.placeholders {
            builder.set_placeholder(name.clone(), value.clone());
        }
        builder
    }
}
