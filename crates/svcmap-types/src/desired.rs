//! Desired state and reconciliation intents
//!
//! A `DesiredState` is the flat attribute set supplied by the caller. The
//! recognized keys name the namespace, service and instance; every other key
//! is forwarded to the registry untouched.

use crate::attributes::{self, Attributes};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building a desired state
#[derive(Debug, Error)]
pub enum DesiredStateError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Desired state must be a JSON object")]
    NotAnObject,

    #[error("Unsupported value for '{key}': nested arrays and objects are not allowed")]
    UnsupportedValue { key: String },

    #[error("Invalid override '{0}': expected key=value")]
    InvalidOverride(String),

    #[error("Unknown intent '{0}'")]
    UnknownIntent(String),
}

/// Supported reconciliation intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RegisterInstance,
    UpdateInstance,
    DeregisterInstance,
    DeleteService,
    GetInstances,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::RegisterInstance,
        Intent::UpdateInstance,
        Intent::DeregisterInstance,
        Intent::DeleteService,
        Intent::GetInstances,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::RegisterInstance => "register_instance",
            Intent::UpdateInstance => "update_instance",
            Intent::DeregisterInstance => "deregister_instance",
            Intent::DeleteService => "delete_service",
            Intent::GetInstances => "get_instances",
        }
    }

    /// Keys that must be present and non-empty before any registry call
    pub fn required_keys(&self) -> &'static [&'static str] {
        use attributes::{INSTANCE_NAME, NAMESPACE, SERVICE_NAME, TYPE};
        match self {
            Intent::RegisterInstance => &[NAMESPACE, SERVICE_NAME, TYPE, INSTANCE_NAME],
            Intent::UpdateInstance | Intent::DeregisterInstance => {
                &[NAMESPACE, SERVICE_NAME, INSTANCE_NAME]
            }
            Intent::DeleteService | Intent::GetInstances => &[NAMESPACE, SERVICE_NAME],
        }
    }

    /// Whether the intent creates the service when it cannot be resolved
    pub fn creates_missing_service(&self) -> bool {
        matches!(self, Intent::RegisterInstance | Intent::DeleteService)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = DesiredStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| DesiredStateError::UnknownIntent(s.to_string()))
    }
}

/// Caller-supplied desired state for one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState {
    attributes: Attributes,
}

impl DesiredState {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Parse a flat JSON object
    ///
    /// Strings are taken verbatim, numbers and booleans become their JSON
    /// text, and `null` is treated as an absent key.
    pub fn from_json_str(input: &str) -> Result<Self, DesiredStateError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        let object = match value {
            serde_json::Value::Object(object) => object,
            _ => return Err(DesiredStateError::NotAnObject),
        };

        let mut attributes = Attributes::new();
        for (key, value) in object {
            match value {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    attributes.insert(key, s);
                }
                serde_json::Value::Bool(b) => {
                    attributes.insert(key, b.to_string());
                }
                serde_json::Value::Number(n) => {
                    attributes.insert(key, n.to_string());
                }
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(DesiredStateError::UnsupportedValue { key });
                }
            }
        }

        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get_non_empty(key)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get(attributes::NAMESPACE)
    }

    pub fn service_name(&self) -> Option<&str> {
        self.get(attributes::SERVICE_NAME)
    }

    pub fn instance_name(&self) -> Option<&str> {
        self.get(attributes::INSTANCE_NAME)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(attributes::DESCRIPTION)
    }

    /// First key of `keys` that is absent or empty
    pub fn first_missing<'k>(&self, keys: &[&'k str]) -> Option<&'k str> {
        keys.iter().copied().find(|key| self.get(key).is_none())
    }
}

impl From<Attributes> for DesiredState {
    fn from(attributes: Attributes) -> Self {
        Self::new(attributes)
    }
}

/// Parse a `key=value` override; the value may itself contain `=`
pub fn parse_override(raw: &str) -> Result<(String, String), DesiredStateError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(DesiredStateError::InvalidOverride(raw.to_string())),
    }
}
