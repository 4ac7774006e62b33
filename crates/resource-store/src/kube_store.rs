//! Kubernetes-backed [`ResourceStore`]

use crate::error::StoreError;
use crate::store_trait::ResourceStore;
use crds::{CassandraDatacenter, ProgressState};
use k8s_openapi::api::core::v1::Service;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Resource store talking to the API server through a shared kube [`Client`].
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl std::fmt::Debug for KubeResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceStore").finish_non_exhaustive()
    }
}

impl KubeResourceStore {
    /// Creates a store over an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Namespace and name of an object about to be written.
fn object_key(service: &Service) -> Result<(&str, &str), StoreError> {
    let namespace = service
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| StoreError::InvalidObject("Service missing namespace".to_string()))?;
    let name = service
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| StoreError::InvalidObject("Service missing name".to_string()))?;
    Ok((namespace, name))
}

#[async_trait::async_trait]
impl ResourceStore for KubeResourceStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        debug!("Getting Service {}/{}", namespace, name);
        self.services(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("Service {namespace}/{name}")))
    }

    async fn create_service(&self, service: &Service) -> Result<Service, StoreError> {
        let (namespace, name) = object_key(service)?;
        debug!("Creating Service {}/{}", namespace, name);
        self.services(namespace)
            .create(&PostParams::default(), service)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("Service {namespace}/{name}")))
    }

    async fn update_service(&self, service: &Service) -> Result<Service, StoreError> {
        let (namespace, name) = object_key(service)?;
        if service.metadata.resource_version.is_none() {
            return Err(StoreError::InvalidObject(format!(
                "Service {namespace}/{name} update without resourceVersion"
            )));
        }
        debug!("Replacing Service {}/{}", namespace, name);
        self.services(namespace)
            .replace(name, &PostParams::default(), service)
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("Service {namespace}/{name}")))
    }

    async fn patch_datacenter_progress(
        &self,
        namespace: &str,
        name: &str,
        progress: ProgressState,
    ) -> Result<(), StoreError> {
        let api: Api<CassandraDatacenter> = Api::namespaced(self.client.clone(), namespace);
        let status_patch = serde_json::json!({
            "status": {
                "cassandraOperatorProgress": progress,
            }
        });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await
            .map_err(|e| StoreError::from_kube(e, &format!("CassandraDatacenter {namespace}/{name}")))?;
        Ok(())
    }
}
