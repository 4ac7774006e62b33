//! ResourceStore trait for mocking
//!
//! This trait abstracts the Kubernetes API calls made by a reconcile pass.
//! [`crate::KubeResourceStore`] implements it against a live cluster; tests use
//! the in-memory `MockResourceStore` behind the `test-util` feature.

use crate::error::StoreError;
use crds::ProgressState;
use k8s_openapi::api::core::v1::Service;

/// Store operations needed to converge a datacenter's Services.
///
/// Every call completes (or fails) before the pass moves on; no call applies
/// its own timeout.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a Service; `StoreError::NotFound` when it does not exist.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError>;

    /// Create a Service. Fails with `Conflict` if it already exists.
    async fn create_service(&self, service: &Service) -> Result<Service, StoreError>;

    /// Replace a Service. `metadata.resourceVersion` must carry the observed
    /// concurrency token; a stale token fails with `Conflict`.
    async fn update_service(&self, service: &Service) -> Result<Service, StoreError>;

    /// Record the datacenter's coarse progress in its status subresource.
    async fn patch_datacenter_progress(
        &self,
        namespace: &str,
        name: &str,
        progress: ProgressState,
    ) -> Result<(), StoreError>;
}
