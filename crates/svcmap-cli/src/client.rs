//! HTTP client for the service registry API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use svcmap_registry::{RegistryClient, RegistryError, Result};
use svcmap_types::{
    Attributes, CreateServiceRequest, InstanceId, InstanceRecord, NamespaceId, NamespaceSummary,
    Operation, OperationId, PageToken, ServiceId, ServicePage,
};

/// JSON-over-HTTP registry client
pub struct HttpRegistryClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NamespacesResponse {
    namespaces: Vec<NamespaceSummary>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: ServiceId,
}

#[derive(Debug, Deserialize)]
struct InstancesResponse {
    #[serde(default)]
    instances: Vec<InstanceRecord>,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    operation_id: OperationId,
}

#[derive(Debug, Serialize)]
struct UpsertInstanceRequest<'a> {
    attributes: &'a Attributes,
}

impl HttpRegistryClient {
    /// Create a new registry client
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(transport)?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::NOT_FOUND {
            let message = response.text().await.unwrap_or_default();
            Err(RegistryError::NotFound(message))
        } else if status == StatusCode::CONFLICT {
            let message = response.text().await.unwrap_or_default();
            Err(RegistryError::ResourceInUse(message))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(RegistryError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn transport(err: reqwest::Error) -> RegistryError {
    RegistryError::Transport(err.to_string())
}

/// Query parameters for one page of a service listing
fn service_query(
    namespace_id: &NamespaceId,
    page_size: u32,
    token: Option<&PageToken>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("namespace_id", namespace_id.to_string()),
        ("max_results", page_size.to_string()),
    ];
    if let Some(token) = token {
        query.push(("next_token", token.as_str().to_string()));
    }
    query
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>> {
        let response: NamespacesResponse =
            self.send(self.client.get(self.url("/namespaces"))).await?;
        Ok(response.namespaces)
    }

    async fn list_services(
        &self,
        namespace_id: &NamespaceId,
        page_size: u32,
        token: Option<&PageToken>,
    ) -> Result<ServicePage> {
        let request = self
            .client
            .get(self.url("/services"))
            .query(&service_query(namespace_id, page_size, token));
        self.send(request).await
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> Result<ServiceId> {
        let response: CreatedResponse = self
            .send(self.client.post(self.url("/services")).json(request))
            .await?;
        Ok(response.id)
    }

    async fn delete_service(&self, service_id: &ServiceId) -> Result<()> {
        self.send_empty(
            self.client
                .delete(self.url(&format!("/services/{}", service_id))),
        )
        .await
    }

    async fn list_instances(&self, service_id: &ServiceId) -> Result<Vec<InstanceRecord>> {
        let response: InstancesResponse = self
            .send(
                self.client
                    .get(self.url(&format!("/services/{}/instances", service_id))),
            )
            .await?;
        Ok(response.instances)
    }

    async fn upsert_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
        attributes: &Attributes,
    ) -> Result<OperationId> {
        let response: OperationResponse = self
            .send(
                self.client
                    .put(self.url(&format!(
                        "/services/{}/instances/{}",
                        service_id, instance_id
                    )))
                    .json(&UpsertInstanceRequest { attributes }),
            )
            .await?;
        Ok(response.operation_id)
    }

    async fn deregister_instance(
        &self,
        service_id: &ServiceId,
        instance_id: &InstanceId,
    ) -> Result<OperationId> {
        let response: OperationResponse = self
            .send(self.client.delete(self.url(&format!(
                "/services/{}/instances/{}",
                service_id, instance_id
            ))))
            .await?;
        Ok(response.operation_id)
    }

    async fn get_operation(&self, operation_id: &OperationId) -> Result<Operation> {
        let record: serde_json::Value = self
            .send(
                self.client
                    .get(self.url(&format!("/operations/{}", operation_id))),
            )
            .await?;

        let status = record
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| {
                RegistryError::Serialization(format!(
                    "Operation {} has no status field",
                    operation_id
                ))
            })?
            .to_string();

        Ok(Operation::new(operation_id.clone(), status).with_record(record))
    }
}
