//! Registry client trait
//!
//! The RegistryClient is the only collaborator the reconciler talks to.
//! Implementations are expected to be stateless between calls.

use crate::error::Result;
use async_trait::async_trait;
use svcmap_types::{
    Attributes, CreateServiceRequest, InstanceId, InstanceRecord, NamespaceId, NamespaceSummary,
    Operation, OperationId, PageToken, ServiceId, ServicePage,
};

/// Remote service registry
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// List every namespace (single, unpaginated call)
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>>;

    /// List one page of services belonging to a namespace
    async fn list_services(
        &self,
        namespace_id: &NamespaceId,
        page_size: u32,
        token: Option<&PageToken>,
    ) -> Result<ServicePage>;

    /// Create a service and return its identifier
    async fn create_service(&self, request: &CreateServiceRequest) -> Result<ServiceId>;

    /// Delete a service; fails while it still has instances
    async fn delete_service(&self, service_id: &ServiceId) -> Result<()>;

    /// List every instance of a service
    async fn list_instances(&self, service_id: &ServiceId) -> Result<Vec<InstanceRecord>>;

    /// Create or overwrite an instance
    ///
    /// If `instance_id` is already registered under `service_id`, its whole
    /// attribute set is replaced by `attributes`; nothing is merged
    /// registry-side. The change is applied asynchronously and tracked by the
    /// returned operation.
    async fn upsert_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
        attributes: &Attributes,
    ) -> Result<OperationId>;

    /// Remove an instance asynchronously
    async fn deregister_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
    ) -> Result<OperationId>;

    /// Fetch the current state of an asynchronous operation
    async fn get_operation(&self, operation_id: &OperationId) -> Result<Operation>;
}
