//! Records exchanged with the registry

use crate::attributes::Attributes;
use crate::ids::{InstanceId, NamespaceId, OperationId, ServiceId};
use serde::{Deserialize, Serialize};

/// A namespace as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSummary {
    pub id: NamespaceId,
    pub name: String,
}

/// A service as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub name: String,
}

/// Opaque continuation token for paginated listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a service listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePage {
    pub services: Vec<ServiceSummary>,
    /// Present while more pages remain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<PageToken>,
}

/// A registered instance and its attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    #[serde(default)]
    pub attributes: Attributes,
}

impl InstanceRecord {
    pub fn instance_name(&self) -> Option<&str> {
        self.attributes.get(crate::attributes::INSTANCE_NAME)
    }
}

/// Parameters for creating a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub namespace_id: NamespaceId,
    pub name: String,
    pub description: String,
    /// Consecutive failed custom health checks before an instance is unhealthy
    pub health_check_failure_threshold: u32,
}

/// Classified status of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Success,
    Failed,
}

/// Snapshot of an asynchronous registry operation
///
/// `status` is the raw label reported by the registry; classification into
/// `OperationStatus` depends on the labels configured by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub status: String,
    /// Full record as returned by the registry
    #[serde(default)]
    pub record: serde_json::Value,
}

impl Operation {
    pub fn new(id: OperationId, status: impl Into<String>) -> Self {
        Self {
            id,
            status: status.into(),
            record: serde_json::Value::Null,
        }
    }

    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record = record;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_has_no_token() {
        let page: ServicePage =
            serde_json::from_str(r#"{"services": [{"id": "s-1", "name": "api"}]}"#).unwrap();
        assert_eq!(page.services.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_instance_name_comes_from_attributes() {
        let record: InstanceRecord = serde_json::from_str(
            r#"{"id": "i-1", "attributes": {"instance_name": "web-1", "port": "80"}}"#,
        )
        .unwrap();
        assert_eq!(record.instance_name(), Some("web-1"));
    }
}
