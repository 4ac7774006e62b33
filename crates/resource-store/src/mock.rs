//! In-memory resource store and event sink for unit testing
//!
//! The mock behaves like the API server where it matters for convergence logic:
//! - creating an existing object fails with `Conflict`
//! - updates must carry the current `resourceVersion`
//! - `spec.clusterIP` and unset node ports are allocated on create, and
//!   `spec.clusterIP` is immutable afterwards
//!
//! Failures can be injected per operation, and every call is logged so tests can
//! assert on the exact set of writes a pass performed.

use crate::error::StoreError;
use crate::events::{EventKind, EventSink};
use crate::store_trait::ResourceStore;
use crds::ProgressState;
use k8s_openapi::api::core::v1::{ObjectReference, Service};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

type ObjectKey = (String, String);

/// One call made against the mock store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `get_service`
    Get { namespace: String, name: String },
    /// `create_service`
    Create { namespace: String, name: String },
    /// `update_service`
    Update { namespace: String, name: String },
    /// `patch_datacenter_progress`
    PatchProgress { namespace: String, name: String, progress: ProgressState },
}

/// Failure injected into a mock operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Behaves like HTTP 403
    Forbidden,
    /// Behaves like HTTP 409
    Conflict,
    /// Behaves like HTTP 503
    Unavailable,
}

impl MockFailure {
    fn to_error(self, what: &str) -> StoreError {
        match self {
            MockFailure::Forbidden => StoreError::Forbidden(format!("{what}: injected")),
            MockFailure::Conflict => StoreError::Conflict(format!("{what}: injected")),
            MockFailure::Unavailable => StoreError::Api(format!("{what}: service unavailable")),
        }
    }
}

/// In-memory [`ResourceStore`]
#[derive(Debug, Clone, Default)]
pub struct MockResourceStore {
    services: Arc<Mutex<BTreeMap<ObjectKey, Service>>>,
    progress: Arc<Mutex<BTreeMap<ObjectKey, ProgressState>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    get_failure: Arc<Mutex<Option<MockFailure>>>,
    create_failure: Arc<Mutex<Option<MockFailure>>>,
    update_failure: Arc<Mutex<Option<MockFailure>>>,
    // Counter backing resource versions and allocated addresses
    next_id: Arc<Mutex<u64>>,
}

impl MockResourceStore {
    /// Create an empty mock store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a Service as if it had been created earlier (for test setup).
    ///
    /// A missing `resourceVersion` is assigned. Seeding is not logged as a call.
    pub fn add_service(&self, mut service: Service) {
        if service.metadata.resource_version.is_none() {
            service.metadata.resource_version = Some(self.next_id().to_string());
        }
        let key = key_of(&service);
        self.services.lock().unwrap().insert(key, service);
    }

    /// Current stored copy of a Service
    #[must_use]
    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.services
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Remove a Service behind the controller's back (simulates external deletion)
    pub fn remove_service(&self, namespace: &str, name: &str) {
        self.services
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    /// Number of stored Services
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.lock().unwrap().len()
    }

    /// Last progress patched for a datacenter
    #[must_use]
    pub fn progress(&self, namespace: &str, name: &str) -> Option<ProgressState> {
        self.progress
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }

    /// All calls in order
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Forget logged calls (e.g. between two passes)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Names of Services created, in call order
    #[must_use]
    pub fn created_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names of Services updated, in call order
    #[must_use]
    pub fn updated_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Update { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Number of Service writes (creates plus updates) logged
    #[must_use]
    pub fn service_writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create { .. } | StoreCall::Update { .. }))
            .count()
    }

    /// Make every subsequent `get_service` fail
    pub fn fail_gets(&self, failure: Option<MockFailure>) {
        *self.get_failure.lock().unwrap() = failure;
    }

    /// Make every subsequent `create_service` fail
    pub fn fail_creates(&self, failure: Option<MockFailure>) {
        *self.create_failure.lock().unwrap() = failure;
    }

    /// Make every subsequent `update_service` fail
    pub fn fail_updates(&self, failure: Option<MockFailure>) {
        *self.update_failure.lock().unwrap() = failure;
    }

    fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn log(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn key_of(service: &Service) -> ObjectKey {
    (
        service.metadata.namespace.clone().unwrap_or_default(),
        service.metadata.name.clone().unwrap_or_default(),
    )
}

fn cluster_ip(service: &Service) -> Option<&str> {
    service.spec.as_ref().and_then(|s| s.cluster_ip.as_deref())
}

#[async_trait::async_trait]
impl ResourceStore for MockResourceStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.log(StoreCall::Get {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        let what = format!("Service {namespace}/{name}");
        if let Some(failure) = *self.get_failure.lock().unwrap() {
            return Err(failure.to_error(&what));
        }
        self.service(namespace, name)
            .ok_or(StoreError::NotFound(what))
    }

    async fn create_service(&self, service: &Service) -> Result<Service, StoreError> {
        let (namespace, name) = key_of(service);
        self.log(StoreCall::Create {
            namespace: namespace.clone(),
            name: name.clone(),
        });
        let what = format!("Service {namespace}/{name}");
        if let Some(failure) = *self.create_failure.lock().unwrap() {
            return Err(failure.to_error(&what));
        }
        if self.service(&namespace, &name).is_some() {
            return Err(StoreError::Conflict(format!("{what} already exists")));
        }

        let id = self.next_id();
        let mut stored = service.clone();
        stored.metadata.resource_version = Some(id.to_string());
        stored.metadata.uid = Some(format!("uid-{id}"));

        // Platform-allocated fields
        let spec = stored.spec.get_or_insert_with(Default::default);
        if spec.cluster_ip.is_none() {
            let ip = format!("10.0.0.{id}");
            spec.cluster_ips = Some(vec![ip.clone()]);
            spec.cluster_ip = Some(ip);
        }
        if spec.type_.as_deref() == Some("NodePort") {
            for (idx, port) in spec.ports.iter_mut().flatten().enumerate() {
                if port.node_port.is_none() {
                    port.node_port = Some(30000 + i32::try_from(id * 10).unwrap_or(0) + i32::try_from(idx).unwrap_or(0));
                }
            }
        }

        self.services
            .lock()
            .unwrap()
            .insert((namespace, name), stored.clone());
        Ok(stored)
    }

    async fn update_service(&self, service: &Service) -> Result<Service, StoreError> {
        let (namespace, name) = key_of(service);
        self.log(StoreCall::Update {
            namespace: namespace.clone(),
            name: name.clone(),
        });
        let what = format!("Service {namespace}/{name}");
        if let Some(failure) = *self.update_failure.lock().unwrap() {
            return Err(failure.to_error(&what));
        }
        let existing = self
            .service(&namespace, &name)
            .ok_or_else(|| StoreError::NotFound(what.clone()))?;

        if service.metadata.resource_version != existing.metadata.resource_version {
            return Err(StoreError::Conflict(format!(
                "{what}: resourceVersion {:?} is stale (current {:?})",
                service.metadata.resource_version, existing.metadata.resource_version
            )));
        }
        if cluster_ip(service) != cluster_ip(&existing) {
            return Err(StoreError::Api(format!(
                "{what}: spec.clusterIP: Invalid value: field is immutable"
            )));
        }

        let mut stored = service.clone();
        stored.metadata.resource_version = Some(self.next_id().to_string());
        stored.metadata.uid = existing.metadata.uid;
        self.services
            .lock()
            .unwrap()
            .insert((namespace, name), stored.clone());
        Ok(stored)
    }

    async fn patch_datacenter_progress(
        &self,
        namespace: &str,
        name: &str,
        progress: ProgressState,
    ) -> Result<(), StoreError> {
        self.log(StoreCall::PatchProgress {
            namespace: namespace.to_string(),
            name: name.to_string(),
            progress,
        });
        self.progress
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), progress);
        Ok(())
    }
}

/// Event captured by [`MockEventSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Name of the object the event is attached to
    pub owner: Option<String>,
    /// Severity
    pub kind: EventKind,
    /// Machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
}

/// [`EventSink`] keeping events in memory
#[derive(Debug, Clone, Default)]
pub struct MockEventSink {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl MockEventSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EventSink for MockEventSink {
    async fn record(&self, owner: &ObjectReference, kind: EventKind, reason: &str, message: &str) {
        self.events.lock().unwrap().push(RecordedEvent {
            owner: owner.name.clone(),
            kind,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}
