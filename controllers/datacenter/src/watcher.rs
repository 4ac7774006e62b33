//! Kubernetes resource watchers.
//!
//! Watches CassandraDatacenter resources, and the Services they own, and
//! triggers reconciliation using kube_runtime::Controller. The controller
//! serialises passes per datacenter and handles reconnection.

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, resource_key};
use crds::CassandraDatacenter;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::Api;
use kube_runtime::{Controller, watcher, controller::{Action, Config as ControllerConfig}};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

async fn reconcile(dc: Arc<CassandraDatacenter>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = resource_key(&dc);
    let action = reconciler
        .reconcile_datacenter(&dc)
        .await
        .into_action(reconciler.resync_interval())?;
    reconciler.clear_backoff(&key);
    Ok(action)
}

/// Requeues a failed datacenter with Fibonacci backoff per resource.
fn error_policy(dc: Arc<CassandraDatacenter>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let key = resource_key(&dc);
    reconciler.increment_error(&key);
    let (backoff_seconds, error_count) = reconciler.get_backoff_for_resource(&key);
    error!(
        "Reconciliation error for CassandraDatacenter {} (error #{}): {}, retrying in {}s",
        key, error_count, error, backoff_seconds
    );
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Watches CassandraDatacenters and their Services.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    datacenter_api: Api<CassandraDatacenter>,
    service_api: Api<Service>,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        datacenter_api: Api<CassandraDatacenter>,
        service_api: Api<Service>,
    ) -> Self {
        Self {
            reconciler,
            datacenter_api,
            service_api,
        }
    }

    /// Runs until the watch stream ends.
    pub async fn watch_datacenters(&self) -> Result<(), ControllerError> {
        info!("Starting CassandraDatacenter watcher");

        // Debounce batches bursts of events (e.g. our own Service writes) into one pass
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_secs(1))
            .concurrency(3);

        Controller::new(self.datacenter_api.clone(), watcher::Config::default())
            .owns(self.service_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled CassandraDatacenter {}", obj),
                    Err(e) => error!("Controller error for CassandraDatacenter: {}", e),
                }
            })
            .await;

        Err(ControllerError::Watch("CassandraDatacenter watch stream ended".to_string()))
    }
}
