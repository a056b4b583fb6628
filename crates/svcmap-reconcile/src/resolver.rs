//! Name resolution
//!
//! Maps human-readable namespace and service names to registry identifiers.
//! Service listings are paginated; the resolver walks them as a lazy stream
//! and only concludes a service is absent after the last page.

use crate::error::{ReconcileError, Result};
use futures::stream::{self, Stream, TryStreamExt};
use svcmap_registry::{RegistryClient, RegistryError};
use svcmap_types::{NamespaceId, PageToken, ServiceId, ServiceSummary};
use tracing::{debug, instrument};

/// Default number of services requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

enum Cursor {
    Start,
    Next(PageToken),
    Exhausted,
}

/// Resolves names against a registry
pub struct NameResolver<'a> {
    client: &'a dyn RegistryClient,
    page_size: u32,
}

impl<'a> NameResolver<'a> {
    pub fn new(client: &'a dyn RegistryClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// Identifier of the namespace called `name`
    #[instrument(skip(self))]
    pub async fn resolve_namespace(&self, name: &str) -> Result<NamespaceId> {
        let namespaces = self.client.list_namespaces().await?;
        namespaces
            .into_iter()
            .find(|ns| ns.name == name)
            .map(|ns| ns.id)
            .ok_or_else(|| ReconcileError::NamespaceNotFound(name.to_string()))
    }

    /// Pages of services in a namespace, fetched on demand
    ///
    /// Each call starts a fresh enumeration from the first page.
    pub fn service_pages(
        &self,
        namespace_id: &'a NamespaceId,
    ) -> impl Stream<Item = std::result::Result<Vec<ServiceSummary>, RegistryError>> + 'a {
        let client = self.client;
        let page_size = self.page_size;

        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Exhausted => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let page = client
                .list_services(namespace_id, page_size, token.as_ref())
                .await?;
            debug!(
                namespace_id = %namespace_id,
                services = page.services.len(),
                has_more = page.next_token.is_some(),
                "Fetched service page"
            );

            let next = match page.next_token {
                Some(token) => Cursor::Next(token),
                None => Cursor::Exhausted,
            };
            Ok::<_, RegistryError>(Some((page.services, next)))
        })
    }

    /// Identifier of the service called `name`, or `None` once every page
    /// has been checked
    #[instrument(skip(self), fields(namespace_id = %namespace_id))]
    pub async fn resolve_service(
        &self,
        namespace_id: &NamespaceId,
        name: &str,
    ) -> Result<Option<ServiceId>> {
        let pages = NameResolver::new(self.client, self.page_size).service_pages(namespace_id);
        futures::pin_mut!(pages);

        while let Some(services) = pages.try_next().await? {
            if let Some(service) = services.into_iter().find(|s| s.name == name) {
                debug!(service_id = %service.id, "Service resolved");
                return Ok(Some(service.id));
            }
        }

        debug!("Service not found after full enumeration");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcmap_registry::InMemoryRegistry;

    #[tokio::test]
    async fn test_resolve_namespace_exact_match() {
        let registry = InMemoryRegistry::new();
        registry.add_namespace("prod-eu").await;
        let prod = registry.add_namespace("prod").await;

        let resolver = NameResolver::new(&registry, DEFAULT_PAGE_SIZE);
        assert_eq!(resolver.resolve_namespace("prod").await.unwrap(), prod);
        assert_eq!(registry.calls().list_namespaces, 1);
    }

    #[tokio::test]
    async fn test_resolve_namespace_not_found() {
        let registry = InMemoryRegistry::new();
        registry.add_namespace("prod").await;

        let resolver = NameResolver::new(&registry, DEFAULT_PAGE_SIZE);
        let err = resolver.resolve_namespace("staging").await.unwrap_err();
        assert!(matches!(err, ReconcileError::NamespaceNotFound(name) if name == "staging"));
    }

    #[tokio::test]
    async fn test_resolve_service_on_last_page_visits_every_page() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        for i in 0..9 {
            registry.add_service(&ns, &format!("filler-{}", i)).await;
        }
        let target = registry.add_service(&ns, "api").await;

        // 10 services, 3 per page: 4 pages with the match on the last one
        let resolver = NameResolver::new(&registry, 3);
        let found = resolver.resolve_service(&ns, "api").await.unwrap();

        assert_eq!(found, Some(target));
        assert_eq!(registry.calls().list_services, 4);
    }

    #[tokio::test]
    async fn test_resolve_service_stops_on_match() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        let target = registry.add_service(&ns, "api").await;
        for i in 0..6 {
            registry.add_service(&ns, &format!("filler-{}", i)).await;
        }

        let resolver = NameResolver::new(&registry, 3);
        assert_eq!(resolver.resolve_service(&ns, "api").await.unwrap(), Some(target));
        assert_eq!(registry.calls().list_services, 1);
    }

    #[tokio::test]
    async fn test_resolve_service_absent_after_all_pages() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        for i in 0..7 {
            registry.add_service(&ns, &format!("filler-{}", i)).await;
        }

        let resolver = NameResolver::new(&registry, 3);
        assert_eq!(resolver.resolve_service(&ns, "api").await.unwrap(), None);
        assert_eq!(registry.calls().list_services, 3);
    }

    #[tokio::test]
    async fn test_service_pages_restart_from_first_page() {
        let registry = InMemoryRegistry::new();
        let ns = registry.add_namespace("prod").await;
        for i in 0..4 {
            registry.add_service(&ns, &format!("svc-{}", i)).await;
        }

        let resolver = NameResolver::new(&registry, 2);
        let first: Vec<Vec<ServiceSummary>> =
            resolver.service_pages(&ns).try_collect().await.unwrap();
        let second: Vec<Vec<ServiceSummary>> =
            resolver.service_pages(&ns).try_collect().await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(registry.calls().list_services, 4);
    }
}
