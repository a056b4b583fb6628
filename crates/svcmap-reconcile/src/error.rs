//! Reconciliation error types

use std::time::Duration;
use svcmap_registry::RegistryError;
use svcmap_types::{Intent, Operation, OperationId};
use thiserror::Error;

/// Reconciliation errors
///
/// Every variant aborts the current intent. Nothing is rolled back: a
/// service created before the failure stays in the registry.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A mandatory key is absent or empty; raised before any registry call
    #[error("'{field}' is a required key for {intent}")]
    MissingRequiredField { field: String, intent: Intent },

    #[error("Namespace {0} not found")]
    NamespaceNotFound(String),

    #[error("Service {service} not found in namespace {namespace}")]
    ServiceNotFound { namespace: String, service: String },

    /// The registry reported terminal failure for a submitted operation
    #[error("Operation {operation_id} failed with status {}: {}", .operation.status, .operation.record)]
    OperationFailed {
        operation_id: OperationId,
        operation: Box<Operation>,
    },

    /// Polling gave up; the remote outcome is unknown
    #[error("Operation {operation_id} timed out after {elapsed:?}, last status {}", .operation.status)]
    OperationTimeout {
        operation_id: OperationId,
        elapsed: Duration,
        operation: Box<Operation>,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ReconcileError {
    pub fn missing(field: &str, intent: Intent) -> Self {
        Self::MissingRequiredField {
            field: field.to_string(),
            intent,
        }
    }

    pub fn service_not_found(namespace: &str, service: &str) -> Self {
        Self::ServiceNotFound {
            namespace: namespace.to_string(),
            service: service.to_string(),
        }
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;
