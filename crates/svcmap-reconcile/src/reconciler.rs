//! Reconciler - one routine per intent
//!
//! Every routine validates its required keys before touching the registry,
//! then re-resolves names from scratch. Nothing is cached between calls, so
//! running the same intent twice with the same desired state converges on
//! the same registry contents.

use crate::error::{ReconcileError, Result};
use crate::merge::{merge_for_register, merge_for_update};
use crate::resolver::{NameResolver, DEFAULT_PAGE_SIZE};
use crate::waiter::{OperationWaiter, WaiterConfig};
use serde::Serialize;
use std::sync::Arc;
use svcmap_registry::RegistryClient;
use svcmap_types::attributes::DESCRIPTION;
use svcmap_types::{
    Attributes, CreateServiceRequest, DesiredState, InstanceId, InstanceRecord, Intent,
    NamespaceId, Operation, OperationId, ServiceId,
};
use tracing::{info, instrument, warn};

/// Reconciler configuration
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Operation polling behaviour
    pub waiter: WaiterConfig,
    /// Services requested per listing page
    pub page_size: u32,
    /// Health check failure threshold for services created on demand
    pub health_check_failure_threshold: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            waiter: WaiterConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            health_check_failure_threshold: 1,
        }
    }
}

/// Result of `register_instance`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutcome {
    pub service_id: ServiceId,
    /// Whether the service was created by this pass
    pub service_created: bool,
    pub instance_id: InstanceId,
    pub operation: Operation,
}

/// Result of `update_instance` and `deregister_instance`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum InstanceChange {
    /// The matching instance was changed and the operation succeeded
    Applied {
        service_id: ServiceId,
        instance_id: InstanceId,
        operation: Operation,
    },
    /// No instance carries this name; the registry was left untouched
    NotFound {
        service_id: ServiceId,
        instance_name: String,
    },
}

impl InstanceChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, InstanceChange::Applied { .. })
    }
}

/// Result of `delete_service`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub service_id: ServiceId,
    /// Whether the service had to be created before it could be deleted
    pub service_created: bool,
}

/// Result of any intent
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "intent", content = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Registered(RegisterOutcome),
    Updated(InstanceChange),
    Deregistered(InstanceChange),
    ServiceDeleted(DeleteOutcome),
    Instances(Vec<InstanceRecord>),
}

/// Reconciles desired state against a registry
pub struct Reconciler {
    client: Arc<dyn RegistryClient>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(client: Arc<dyn RegistryClient>, config: ReconcilerConfig) -> Self {
        Self { client, config }
    }

    /// Run the routine for `intent`
    pub async fn reconcile(
        &self,
        intent: Intent,
        desired: &DesiredState,
        extra: &Attributes,
    ) -> Result<Outcome> {
        match intent {
            Intent::RegisterInstance => self
                .register_instance(desired, extra)
                .await
                .map(Outcome::Registered),
            Intent::UpdateInstance => self
                .update_instance(desired, extra)
                .await
                .map(Outcome::Updated),
            Intent::DeregisterInstance => self
                .deregister_instance(desired)
                .await
                .map(Outcome::Deregistered),
            Intent::DeleteService => self
                .delete_service(desired)
                .await
                .map(Outcome::ServiceDeleted),
            Intent::GetInstances => self.get_instances(desired).await.map(Outcome::Instances),
        }
    }

    /// Create or overwrite the desired instance, creating its service if needed
    ///
    /// The instance id is the desired `instance_name`. Every desired
    /// attribute, `description` included, is written to the instance.
    #[instrument(skip_all, fields(intent = %Intent::RegisterInstance))]
    pub async fn register_instance(
        &self,
        desired: &DesiredState,
        extra: &Attributes,
    ) -> Result<RegisterOutcome> {
        let intent = Intent::RegisterInstance;
        let (namespace, service_name, instance_name) = identity(desired, intent)?;

        let (service_id, service_created) = self
            .resolve_service_for(intent, namespace, service_name, desired)
            .await?;

        let attributes = merge_for_register(desired.attributes(), extra);
        let instance_id = InstanceId::new(instance_name);

        info!(service_id = %service_id, instance_id = %instance_id, "Registering instance");
        let operation_id = self
            .client
            .upsert_instance(&service_id, &instance_id, &attributes)
            .await?;
        let operation = self.wait(&operation_id).await?;

        Ok(RegisterOutcome {
            service_id,
            service_created,
            instance_id,
            operation,
        })
    }

    /// Merge new attributes into the instance called `instance_name`
    ///
    /// A missing instance is reported as `InstanceChange::NotFound` without
    /// touching the registry.
    #[instrument(skip_all, fields(intent = %Intent::UpdateInstance))]
    pub async fn update_instance(
        &self,
        desired: &DesiredState,
        extra: &Attributes,
    ) -> Result<InstanceChange> {
        let intent = Intent::UpdateInstance;
        let (namespace, service_name, instance_name) = identity(desired, intent)?;

        let (service_id, _) = self
            .resolve_service_for(intent, namespace, service_name, desired)
            .await?;
        let Some(current) = self.find_instance(&service_id, instance_name).await? else {
            warn!(service_id = %service_id, instance_name, "No instance to update");
            return Ok(InstanceChange::NotFound {
                service_id,
                instance_name: instance_name.to_string(),
            });
        };

        let attributes = merge_for_update(&current.attributes, desired.attributes(), extra);

        info!(service_id = %service_id, instance_id = %current.id, "Updating instance");
        let operation_id = self
            .client
            .upsert_instance(&service_id, &current.id, &attributes)
            .await?;
        let operation = self.wait(&operation_id).await?;

        Ok(InstanceChange::Applied {
            service_id,
            instance_id: current.id,
            operation,
        })
    }

    /// Remove the instance called `instance_name`
    #[instrument(skip_all, fields(intent = %Intent::DeregisterInstance))]
    pub async fn deregister_instance(&self, desired: &DesiredState) -> Result<InstanceChange> {
        let intent = Intent::DeregisterInstance;
        let (namespace, service_name, instance_name) = identity(desired, intent)?;

        let (service_id, _) = self
            .resolve_service_for(intent, namespace, service_name, desired)
            .await?;
        let Some(current) = self.find_instance(&service_id, instance_name).await? else {
            warn!(service_id = %service_id, instance_name, "No instance to deregister");
            return Ok(InstanceChange::NotFound {
                service_id,
                instance_name: instance_name.to_string(),
            });
        };

        info!(service_id = %service_id, instance_id = %current.id, "Deregistering instance");
        let operation_id = self
            .client
            .deregister_instance(&service_id, &current.id)
            .await?;
        let operation = self.wait(&operation_id).await?;

        Ok(InstanceChange::Applied {
            service_id,
            instance_id: current.id,
            operation,
        })
    }

    /// Delete the service; it must have no instances left
    ///
    /// An unknown service is created first and then deleted, so the pass
    /// always ends with the service gone.
    #[instrument(skip_all, fields(intent = %Intent::DeleteService))]
    pub async fn delete_service(&self, desired: &DesiredState) -> Result<DeleteOutcome> {
        let intent = Intent::DeleteService;
        require(desired, intent)?;
        let (namespace, service_name) = names(desired, intent)?;

        let (service_id, service_created) = self
            .resolve_service_for(intent, namespace, service_name, desired)
            .await?;

        info!(service_id = %service_id, "Deleting service");
        self.client.delete_service(&service_id).await?;
        info!(service_id = %service_id, "Service deleted");

        Ok(DeleteOutcome {
            service_id,
            service_created,
        })
    }

    /// Every instance of an existing service, as the registry reports them
    #[instrument(skip_all, fields(intent = %Intent::GetInstances))]
    pub async fn get_instances(&self, desired: &DesiredState) -> Result<Vec<InstanceRecord>> {
        let intent = Intent::GetInstances;
        require(desired, intent)?;
        let (namespace, service_name) = names(desired, intent)?;

        let (service_id, _) = self
            .resolve_service_for(intent, namespace, service_name, desired)
            .await?;
        Ok(self.client.list_instances(&service_id).await?)
    }

    // --- Internal helpers ---

    fn resolver(&self) -> NameResolver<'_> {
        NameResolver::new(self.client.as_ref(), self.config.page_size)
    }

    async fn wait(&self, operation_id: &OperationId) -> Result<Operation> {
        info!(operation_id = %operation_id, "Operation submitted, waiting for completion");
        OperationWaiter::new(self.client.as_ref(), &self.config.waiter)
            .wait(operation_id)
            .await
    }

    /// Service id for `intent`, plus whether this pass created the service
    ///
    /// Intents that do not create missing services fail with
    /// `ServiceNotFound` instead.
    async fn resolve_service_for(
        &self,
        intent: Intent,
        namespace: &str,
        service_name: &str,
        desired: &DesiredState,
    ) -> Result<(ServiceId, bool)> {
        let resolver = self.resolver();
        let namespace_id = resolver.resolve_namespace(namespace).await?;

        if let Some(service_id) = resolver.resolve_service(&namespace_id, service_name).await? {
            return Ok((service_id, false));
        }
        if !intent.creates_missing_service() {
            return Err(ReconcileError::service_not_found(namespace, service_name));
        }

        let service_id = self
            .create_service(namespace_id, service_name, desired, intent)
            .await?;
        Ok((service_id, true))
    }

    async fn create_service(
        &self,
        namespace_id: NamespaceId,
        service_name: &str,
        desired: &DesiredState,
        intent: Intent,
    ) -> Result<ServiceId> {
        let description = desired
            .description()
            .ok_or_else(|| ReconcileError::missing(DESCRIPTION, intent))?;

        let request = CreateServiceRequest {
            namespace_id,
            name: service_name.to_string(),
            description: description.to_string(),
            health_check_failure_threshold: self.config.health_check_failure_threshold,
        };
        let service_id = self.client.create_service(&request).await?;
        info!(service_id = %service_id, service_name, "Service created");

        Ok(service_id)
    }

    /// First instance whose `instance_name` attribute matches
    async fn find_instance(
        &self,
        service_id: &ServiceId,
        instance_name: &str,
    ) -> Result<Option<InstanceRecord>> {
        let mut matching = self
            .client
            .list_instances(service_id)
            .await?
            .into_iter()
            .filter(|instance| instance.instance_name() == Some(instance_name));

        let first = matching.next();
        let others = matching.count();
        if others > 0 {
            warn!(
                service_id = %service_id,
                instance_name,
                duplicates = others,
                "Several instances share this name; only the first is changed"
            );
        }
        Ok(first)
    }
}

fn require(desired: &DesiredState, intent: Intent) -> Result<()> {
    match desired.first_missing(intent.required_keys()) {
        Some(field) => Err(ReconcileError::missing(field, intent)),
        None => Ok(()),
    }
}

fn names(desired: &DesiredState, intent: Intent) -> Result<(&str, &str)> {
    let namespace = desired
        .namespace()
        .ok_or_else(|| ReconcileError::missing(svcmap_types::attributes::NAMESPACE, intent))?;
    let service_name = desired
        .service_name()
        .ok_or_else(|| ReconcileError::missing(svcmap_types::attributes::SERVICE_NAME, intent))?;
    Ok((namespace, service_name))
}

/// Namespace, service and instance names after checking required keys
fn identity(desired: &DesiredState, intent: Intent) -> Result<(&str, &str, &str)> {
    require(desired, intent)?;
    let (namespace, service_name) = names(desired, intent)?;
    let instance_name = desired
        .instance_name()
        .ok_or_else(|| ReconcileError::missing(svcmap_types::attributes::INSTANCE_NAME, intent))?;
    Ok((namespace, service_name, instance_name))
}
