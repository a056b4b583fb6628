//! In-memory registry backend
//!
//! Suitable for development and testing. Every call is counted so tests can
//! assert exactly which registry calls a reconciliation pass made, and the
//! status sequence of the next submitted operations can be scripted.

use crate::client::RegistryClient;
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use svcmap_types::{
    Attributes, CreateServiceRequest, InstanceId, InstanceRecord, NamespaceId, NamespaceSummary,
    Operation, OperationId, PageToken, ServiceId, ServicePage, ServiceSummary,
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Status label of an operation still in flight
pub const PENDING_STATUS: &str = "PENDING";
/// Status label of a successful operation
pub const SUCCESS_STATUS: &str = "SUCCESS";
/// Status label of a failed operation
pub const FAIL_STATUS: &str = "FAIL";

/// Snapshot of how many times each registry call was made
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_namespaces: usize,
    pub list_services: usize,
    pub create_service: usize,
    pub delete_service: usize,
    pub list_instances: usize,
    pub upsert_instance: usize,
    pub deregister_instance: usize,
    pub get_operation: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_namespaces
            + self.list_services
            + self.create_service
            + self.delete_service
            + self.list_instances
            + self.upsert_instance
            + self.deregister_instance
            + self.get_operation
    }

    /// Calls that change registry state
    pub fn mutations(&self) -> usize {
        self.create_service + self.delete_service + self.upsert_instance + self.deregister_instance
    }
}

#[derive(Default)]
struct Counters {
    list_namespaces: AtomicUsize,
    list_services: AtomicUsize,
    create_service: AtomicUsize,
    delete_service: AtomicUsize,
    list_instances: AtomicUsize,
    upsert_instance: AtomicUsize,
    deregister_instance: AtomicUsize,
    get_operation: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> CallCounts {
        CallCounts {
            list_namespaces: self.list_namespaces.load(Ordering::SeqCst),
            list_services: self.list_services.load(Ordering::SeqCst),
            create_service: self.create_service.load(Ordering::SeqCst),
            delete_service: self.delete_service.load(Ordering::SeqCst),
            list_instances: self.list_instances.load(Ordering::SeqCst),
            upsert_instance: self.upsert_instance.load(Ordering::SeqCst),
            deregister_instance: self.deregister_instance.load(Ordering::SeqCst),
            get_operation: self.get_operation.load(Ordering::SeqCst),
        }
    }
}

struct ServiceEntry {
    summary: ServiceSummary,
    namespace_id: NamespaceId,
    description: String,
    health_check_failure_threshold: u32,
}

enum PendingEffect {
    Upsert {
        service_id: ServiceId,
        instance_id: InstanceId,
        attributes: Attributes,
    },
    Deregister {
        service_id: ServiceId,
        instance_id: InstanceId,
    },
}

struct OperationEntry {
    kind: &'static str,
    /// Remaining statuses; the last one repeats forever
    statuses: VecDeque<String>,
    effect: Option<PendingEffect>,
}

/// In-memory service registry
pub struct InMemoryRegistry {
    namespaces: RwLock<Vec<NamespaceSummary>>,
    services: RwLock<Vec<ServiceEntry>>,
    instances: DashMap<ServiceId, BTreeMap<InstanceId, Attributes>>,
    operations: DashMap<OperationId, OperationEntry>,
    scripts: Mutex<VecDeque<Vec<String>>>,
    success_status: String,
    next_id: AtomicU64,
    counters: Counters,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(Vec::new()),
            services: RwLock::new(Vec::new()),
            instances: DashMap::new(),
            operations: DashMap::new(),
            scripts: Mutex::new(VecDeque::new()),
            success_status: SUCCESS_STATUS.to_string(),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Use `status` as the success label instead of [`SUCCESS_STATUS`]
    ///
    /// Unscripted operations report it, and an operation's effect is applied
    /// the first time it is reported.
    pub fn with_success_status(mut self, status: impl Into<String>) -> Self {
        self.success_status = status.into();
        self
    }

    fn generate_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}-{:08}", prefix, n)
    }

    /// Seed a namespace; namespaces are never created through the client
    pub async fn add_namespace(&self, name: &str) -> NamespaceId {
        let id = NamespaceId::new(self.generate_id("ns"));
        self.namespaces.write().await.push(NamespaceSummary {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Seed a service without counting a create call
    pub async fn add_service(&self, namespace_id: &NamespaceId, name: &str) -> ServiceId {
        let id = ServiceId::new(self.generate_id("srv"));
        self.services.write().await.push(ServiceEntry {
            summary: ServiceSummary {
                id: id.clone(),
                name: name.to_string(),
            },
            namespace_id: namespace_id.clone(),
            description: String::new(),
            health_check_failure_threshold: 1,
        });
        id
    }

    /// Seed an instance without going through an operation
    pub fn add_instance(&self, service_id: &ServiceId, instance_id: &str, attributes: Attributes) {
        self.instances
            .entry(service_id.clone())
            .or_default()
            .insert(InstanceId::new(instance_id), attributes);
    }

    /// Script the status sequence reported by the next submitted operation
    ///
    /// Each `get_operation` call consumes one status; the last one repeats.
    /// Operations submitted without a script succeed immediately. The
    /// operation takes effect once it reports the registry's success label.
    pub async fn script_operation<S: Into<String>>(&self, statuses: impl IntoIterator<Item = S>) {
        let statuses: Vec<String> = statuses.into_iter().map(Into::into).collect();
        self.scripts.lock().await.push_back(statuses);
    }

    /// Attributes currently stored for an instance
    pub fn instance_attributes(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
    ) -> Option<Attributes> {
        self.instances
            .get(service_id)
            .and_then(|instances| instances.get(instance_id).cloned())
    }

    /// Description a service was created with
    pub async fn service_description(&self, service_id: &ServiceId) -> Option<String> {
        self.services
            .read()
            .await
            .iter()
            .find(|s| &s.summary.id == service_id)
            .map(|s| s.description.clone())
    }

    /// Health check failure threshold a service was created with
    pub async fn service_failure_threshold(&self, service_id: &ServiceId) -> Option<u32> {
        self.services
            .read()
            .await
            .iter()
            .find(|s| &s.summary.id == service_id)
            .map(|s| s.health_check_failure_threshold)
    }

    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }

    /// Call counts so far
    pub fn calls(&self) -> CallCounts {
        self.counters.snapshot()
    }

    async fn submit(&self, kind: &'static str, effect: PendingEffect) -> OperationId {
        let id = OperationId::new(self.generate_id("op"));
        let statuses = self
            .scripts
            .lock()
            .await
            .pop_front()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![self.success_status.clone()]);

        debug!(operation_id = %id, kind, "Operation submitted");
        self.operations.insert(
            id.clone(),
            OperationEntry {
                kind,
                statuses: statuses.into(),
                effect: Some(effect),
            },
        );
        id
    }

    fn apply(&self, effect: PendingEffect) {
        match effect {
            PendingEffect::Upsert {
                service_id,
                instance_id,
                attributes,
            } => {
                self.instances
                    .entry(service_id)
                    .or_default()
                    .insert(instance_id, attributes);
            }
            PendingEffect::Deregister {
                service_id,
                instance_id,
            } => {
                if let Some(mut instances) = self.instances.get_mut(&service_id) {
                    instances.remove(&instance_id);
                }
            }
        }
    }

    async fn service_exists(&self, service_id: &ServiceId) -> bool {
        self.services
            .read()
            .await
            .iter()
            .any(|s| &s.summary.id == service_id)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>> {
        Counters::bump(&self.counters.list_namespaces);
        Ok(self.namespaces.read().await.clone())
    }

    async fn list_services(
        &self,
        namespace_id: &NamespaceId,
        page_size: u32,
        token: Option<&PageToken>,
    ) -> Result<ServicePage> {
        Counters::bump(&self.counters.list_services);

        let offset = match token {
            Some(token) => token.as_str().parse::<usize>().map_err(|_| RegistryError::Api {
                status: 400,
                message: format!("Invalid pagination token: {}", token.as_str()),
            })?,
            None => 0,
        };
        let page_size = page_size.max(1) as usize;

        let services = self.services.read().await;
        let matching: Vec<&ServiceEntry> = services
            .iter()
            .filter(|s| &s.namespace_id == namespace_id)
            .collect();

        let page: Vec<ServiceSummary> = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|s| s.summary.clone())
            .collect();

        let next = offset + page_size;
        let next_token = (next < matching.len()).then(|| PageToken::new(next.to_string()));

        Ok(ServicePage {
            services: page,
            next_token,
        })
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<ServiceId> {
        Counters::bump(&self.counters.create_service);

        let namespace_known = self
            .namespaces
            .read()
            .await
            .iter()
            .any(|n| n.id == request.namespace_id);
        if !namespace_known {
            return Err(RegistryError::NotFound(format!(
                "Namespace {}",
                request.namespace_id
            )));
        }

        let mut services = self.services.write().await;
        if services
            .iter()
            .any(|s| s.namespace_id == request.namespace_id && s.summary.name == request.name)
        {
            return Err(RegistryError::AlreadyExists(format!(
                "Service {}",
                request.name
            )));
        }

        let id = ServiceId::new(self.generate_id("srv"));
        services.push(ServiceEntry {
            summary: ServiceSummary {
                id: id.clone(),
                name: request.name.clone(),
            },
            namespace_id: request.namespace_id.clone(),
            description: request.description.clone(),
            health_check_failure_threshold: request.health_check_failure_threshold,
        });
        Ok(id)
    }

    async fn delete_service(&self, service_id: &ServiceId) -> Result<()> {
        Counters::bump(&self.counters.delete_service);

        let has_instances = self
            .instances
            .get(service_id)
            .map(|instances| !instances.is_empty())
            .unwrap_or(false);
        if has_instances {
            return Err(RegistryError::ResourceInUse(format!(
                "Service {} still has registered instances",
                service_id
            )));
        }

        let mut services = self.services.write().await;
        let before = services.len();
        services.retain(|s| &s.summary.id != service_id);
        if services.len() == before {
            return Err(RegistryError::NotFound(format!("Service {}", service_id)));
        }
        self.instances.remove(service_id);
        Ok(())
    }

    async fn list_instances(&self, service_id: &ServiceId) -> Result<Vec<InstanceRecord>> {
        Counters::bump(&self.counters.list_instances);

        if !self.service_exists(service_id).await {
            return Err(RegistryError::NotFound(format!("Service {}", service_id)));
        }

        Ok(self
            .instances
            .get(service_id)
            .map(|instances| {
                instances
                    .iter()
                    .map(|(id, attributes)| InstanceRecord {
                        id: id.clone(),
                        attributes: attributes.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
        attributes: &Attributes,
    ) -> Result<OperationId> {
        Counters::bump(&self.counters.upsert_instance);

        if !self.service_exists(service_id).await {
            return Err(RegistryError::NotFound(format!("Service {}", service_id)));
        }

        Ok(self
            .submit(
                "REGISTER_INSTANCE",
                PendingEffect::Upsert {
                    service_id: service_id.clone(),
                    instance_id: instance_id.clone(),
                    attributes: attributes.clone(),
                },
            )
            .await)
    }

    async fn deregister_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
    ) -> Result<OperationId> {
        Counters::bump(&self.counters.deregister_instance);

        let known = self
            .instances
            .get(service_id)
            .map(|instances| instances.contains_key(instance_id))
            .unwrap_or(false);
        if !known {
            return Err(RegistryError::NotFound(format!("Instance {}", instance_id)));
        }

        Ok(self
            .submit(
                "DEREGISTER_INSTANCE",
                PendingEffect::Deregister {
                    service_id: service_id.clone(),
                    instance_id: instance_id.clone(),
                },
            )
            .await)
    }

    async fn get_operation(&self, operation_id: &OperationId) -> Result<Operation> {
        Counters::bump(&self.counters.get_operation);

        let (kind, status, effect) = {
            let mut entry = self
                .operations
                .get_mut(operation_id)
                .ok_or_else(|| RegistryError::NotFound(format!("Operation {}", operation_id)))?;

            let status = if entry.statuses.len() > 1 {
                entry.statuses.pop_front()
            } else {
                entry.statuses.front().cloned()
            }
            .unwrap_or_else(|| self.success_status.clone());

            let effect = if status == self.success_status {
                entry.effect.take()
            } else {
                None
            };
            (entry.kind, status, effect)
        };

        if let Some(effect) = effect {
            self.apply(effect);
        }

        let record = serde_json::json!({
            "Id": operation_id.as_str(),
            "Type": kind,
            "Status": status,
        });
        Ok(Operation::new(operation_id.clone(), status).with_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_list_services_paginates_with_tokens() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        for i in 0..5 {
            registry.add_service(&ns, &format!("svc-{}", i)).await;
        }

        let first = registry.list_services(&ns, 2, None).await.unwrap();
        assert_eq!(first.services.len(), 2);
        let token = first.next_token.expect("more pages");

        let second = registry.list_services(&ns, 2, Some(&token)).await.unwrap();
        assert_eq!(second.services[0].name, "svc-2");

        let third = registry
            .list_services(&ns, 2, second.next_token.as_ref())
            .await
            .unwrap();
        assert_eq!(third.services.len(), 1);
        assert!(third.next_token.is_none());
        assert_eq!(registry.calls().list_services, 3);
    }

    #[tokio::test]
    async fn test_list_services_filters_by_namespace() {
        let registry = InMemoryRegistry::new();
        let prod = registry.add_namespace("prod").await;
        let dev = registry.add_namespace("dev").await;
        registry.add_service(&prod, "api").await;
        registry.add_service(&dev, "worker").await;

        let page = registry.list_services(&dev, 100, None).await.unwrap();
        assert_eq!(page.services.len(), 1);
        assert_eq!(page.services[0].name, "worker");
    }

    #[tokio::test]
    async fn test_upsert_applies_on_success() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        let instance = InstanceId::new("web-1");

        registry
            .script_operation([PENDING_STATUS, SUCCESS_STATUS])
            .await;
        let op = registry
            .upsert_instance(&svc, &instance, &attrs(&[("instance_name", "web-1")]))
            .await
            .unwrap();

        assert_eq!(registry.get_operation(&op).await.unwrap().status, PENDING_STATUS);
        assert!(registry.instance_attributes(&svc, &instance).is_none());

        assert_eq!(registry.get_operation(&op).await.unwrap().status, SUCCESS_STATUS);
        assert!(registry.instance_attributes(&svc, &instance).is_some());

        // Terminal status repeats
        assert_eq!(registry.get_operation(&op).await.unwrap().status, SUCCESS_STATUS);
    }

    #[tokio::test]
    async fn test_custom_success_label_applies_effect() {
        let registry = InMemoryRegistry::new().with_success_status("DONE");
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        let instance = InstanceId::new("web-1");

        registry.script_operation(["RUNNING", "DONE"]).await;
        let scripted = registry
            .upsert_instance(&svc, &instance, &attrs(&[("instance_name", "web-1")]))
            .await
            .unwrap();
        assert_eq!(registry.get_operation(&scripted).await.unwrap().status, "RUNNING");
        assert!(registry.instance_attributes(&svc, &instance).is_none());
        assert_eq!(registry.get_operation(&scripted).await.unwrap().status, "DONE");
        assert!(registry.instance_attributes(&svc, &instance).is_some());

        // Unscripted operations report the custom label too
        let unscripted = registry.deregister_instance(&svc, &instance).await.unwrap();
        assert_eq!(registry.get_operation(&unscripted).await.unwrap().status, "DONE");
        assert!(registry.instance_attributes(&svc, &instance).is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_attributes() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        registry.add_instance(&svc, "web-1", attrs(&[("instance_name", "web-1"), ("old", "x")]));

        let instance = InstanceId::new("web-1");
        let op = registry
            .upsert_instance(&svc, &instance, &attrs(&[("instance_name", "web-1")]))
            .await
            .unwrap();
        registry.get_operation(&op).await.unwrap();

        let stored = registry.instance_attributes(&svc, &instance).unwrap();
        assert!(!stored.contains_key("old"));
    }

    #[tokio::test]
    async fn test_delete_service_with_instances_is_rejected() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        let svc = registry.add_service(&ns, "api").await;
        registry.add_instance(&svc, "web-1", Attributes::new());

        let result = registry.delete_service(&svc).await;
        assert!(matches!(result, Err(RegistryError::ResourceInUse(_))));
        assert_eq!(registry.service_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_service_rejects_duplicates() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        let request = CreateServiceRequest {
            namespace_id: ns.clone(),
            name: "api".to_string(),
            description: "API".to_string(),
            health_check_failure_threshold: 1,
        };

        registry.create_service(&request).await.unwrap();
        let result = registry.create_service(&request).await;
        assert!(matches!(result, Err(RegistryError::AlreadyExists(_))));
        assert_eq!(registry.calls().create_service, 2);
    }
}
