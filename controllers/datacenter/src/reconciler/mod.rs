//! Reconciliation logic for CassandraDatacenter resources.
//!
//! A pass runs a fixed list of steps:
//! - `services`/`diff`: build the desired Services and converge the store
//! - `image_resolution`: resolve the server image
//! - `progress`: record that the datacenter converged

pub mod diff;
pub mod hash;
pub mod image_resolution;
pub mod progress;
pub mod result;
pub mod services;


pub use result::{ReconcileResult, ReconcileStep, run_pipeline};

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crds::{CassandraDatacenter, ProgressState};
use images::{ImageResolver, ReloadableImageConfig};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use resource_store::{EventSink, ResourceStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Steps of one reconcile pass, in order.
const PASS_STEPS: &[&dyn ReconcileStep] = &[
    &diff::CheckServices,
    &image_resolution::ResolveImages,
    &progress::MarkReady,
];

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(5, 300), // 5 seconds min, 5 minutes max
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Everything one pass needs, borrowed for the duration of the pass.
pub struct ReconcileContext<'a> {
    pub dc: &'a CassandraDatacenter,
    pub namespace: String,
    pub name: String,
    /// Controller reference stamped on every managed object
    pub owner_ref: OwnerReference,
    /// Target for events
    pub object_ref: ObjectReference,
    pub store: &'a dyn ResourceStore,
    pub events: &'a dyn EventSink,
    /// Resolver over the image config snapshot taken when the pass started
    pub images: ImageResolver,
    pub cancel: CancellationToken,
    // Progress as last written during this pass; starts from the observed status
    progress: Mutex<ProgressState>,
}

impl<'a> ReconcileContext<'a> {
    pub fn new(
        dc: &'a CassandraDatacenter,
        store: &'a dyn ResourceStore,
        events: &'a dyn EventSink,
        images: ImageResolver,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        let name = dc.metadata.name.clone().unwrap_or_default();
        let namespace = dc.metadata.namespace.clone().ok_or_else(|| {
            ControllerError::InvalidConfig(format!("CassandraDatacenter {name} has no namespace"))
        })?;
        let owner_ref = dc
            .controller_owner_ref(&())
            .ok_or_else(|| ControllerError::MissingOwnerReference(format!("{namespace}/{name}")))?;

        Ok(Self {
            dc,
            object_ref: dc.object_ref(&()),
            namespace,
            name,
            owner_ref,
            store,
            events,
            images,
            cancel,
            progress: Mutex::new(dc.progress()),
        })
    }

    /// `namespace/name` of the datacenter.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Fails with `Cancelled` once the pass has been cancelled.
    pub fn ensure_active(&self) -> Result<(), ControllerError> {
        if self.cancel.is_cancelled() {
            return Err(ControllerError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn progress(&self) -> ProgressState {
        self.progress.lock().map(|p| *p).unwrap_or_else(|e| *e.into_inner())
    }

    pub(crate) fn set_progress(&self, progress: ProgressState) {
        match self.progress.lock() {
            Ok(mut current) => *current = progress,
            Err(e) => *e.into_inner() = progress,
        }
    }
}

/// Reconciles CassandraDatacenter resources.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    events: Arc<dyn EventSink>,
    images: ReloadableImageConfig,
    resync_interval: Duration,
    /// Parent of every per-pass cancellation token
    shutdown: CancellationToken,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        events: Arc<dyn EventSink>,
        images: ReloadableImageConfig,
        resync_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            events,
            images,
            resync_interval,
            shutdown,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Delay before a converged datacenter is checked again.
    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    /// Runs one reconcile pass for `dc`.
    pub async fn reconcile_datacenter(&self, dc: &CassandraDatacenter) -> ReconcileResult {
        let ctx = match ReconcileContext::new(
            dc,
            self.store.as_ref(),
            self.events.as_ref(),
            self.images.resolver(),
            self.shutdown.child_token(),
        ) {
            Ok(ctx) => ctx,
            Err(e) => return ReconcileResult::Error(e),
        };

        info!("Reconciling CassandraDatacenter {}", ctx.key());
        run_pipeline(PASS_STEPS, &ctx).await
    }

    /// Get the Fibonacci backoff duration for a resource based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Forget a resource's backoff after a successful pass.
    ///
    /// The next failure starts again from the minimum delay, and deleted
    /// datacenters leave nothing behind.
    pub fn clear_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

/// `namespace/name` key used for backoff tracking.
pub fn resource_key(dc: &CassandraDatacenter) -> String {
    format!(
        "{}/{}",
        dc.metadata.namespace.as_deref().unwrap_or_default(),
        dc.metadata.name.as_deref().unwrap_or_default()
    )
}
