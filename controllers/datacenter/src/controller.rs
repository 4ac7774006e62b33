//! Main controller implementation.
//!
//! Wires the Kubernetes client, the resource store, the event recorder and the
//! image configuration into a reconciler, then runs the watcher until it exits
//! or a shutdown signal arrives. `SIGHUP` reloads the image configuration.

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::CassandraDatacenter;
use images::ReloadableImageConfig;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use resource_store::{KubeEventSink, KubeResourceStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Reporting controller name on events
pub const CONTROLLER_NAME: &str = "cass-operator";

/// Main controller for CassandraDatacenter resources.
pub struct Controller {
    datacenter_watcher: JoinHandle<Result<(), ControllerError>>,
    config_reloader: JoinHandle<Result<(), ControllerError>>,
    /// Cancelled on shutdown; every reconcile pass holds a child token
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Fails if the image configuration cannot be loaded.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing datacenter controller");

        let images = ReloadableImageConfig::from_file(&config.image_config_path).map_err(|e| {
            error!("Failed to load image config: {}", e);
            ControllerError::from(e)
        })?;

        let kube_client = Client::try_default().await?;

        let (datacenter_api, service_api): (Api<CassandraDatacenter>, Api<Service>) = match config.namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(kube_client.clone(), ns),
                Api::namespaced(kube_client.clone(), ns),
            ),
            None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
        };

        let shutdown = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeResourceStore::new(kube_client.clone())),
            Arc::new(KubeEventSink::new(kube_client, CONTROLLER_NAME)),
            images.clone(),
            config.resync_interval,
            shutdown.clone(),
        ));

        let watcher = Watcher::new(reconciler, datacenter_api, service_api);
        let datacenter_watcher = tokio::spawn(async move { watcher.watch_datacenters().await });
        let config_reloader = tokio::spawn(reload_on_hangup(images, config.image_config_path));

        Ok(Self {
            datacenter_watcher,
            config_reloader,
            shutdown,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Datacenter controller running");

        let result = tokio::select! {
            result = &mut self.datacenter_watcher => {
                result
                    .map_err(|e| ControllerError::Watch(format!("CassandraDatacenter watcher panicked: {e}")))
                    .and_then(|r| r)
            }
            result = &mut self.config_reloader => {
                result
                    .map_err(|e| ControllerError::Watch(format!("Image config reloader panicked: {e}")))
                    .and_then(|r| r)
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        self.shutdown.cancel();
        self.datacenter_watcher.abort();
        self.config_reloader.abort();
        result
    }
}

/// Reloads the image configuration from `path` on every `SIGHUP`.
async fn reload_on_hangup(images: ReloadableImageConfig, path: PathBuf) -> Result<(), ControllerError> {
    let mut hangup = signal(SignalKind::hangup())
        .map_err(|e| ControllerError::InvalidConfig(format!("cannot install SIGHUP handler: {e}")))?;

    while hangup.recv().await.is_some() {
        info!("SIGHUP received, reloading image config");
        reload_image_config(&images, &path);
    }
    Ok(())
}

/// Swaps in the configuration at `path`. Returns whether the swap happened.
fn reload_image_config(images: &ReloadableImageConfig, path: &Path) -> bool {
    match images.reload_from(path) {
        Ok(()) => true,
        Err(e) => {
            error!("Image config reload failed, previous configuration stays active: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_image_config;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reload_swaps_valid_config() {
        let images = ReloadableImageConfig::new(test_image_config());
        let mut file = NamedTempFile::new().expect("create temp file");
        write!(
            file,
            "apiVersion: config.k8ssandra.io/v1beta1\nkind: ImageConfig\nimageRegistry: reloaded.io\n"
        )
        .expect("write temp file");

        assert!(reload_image_config(&images, file.path()));
        assert_eq!(images.current().image_registry, "reloaded.io");
    }

    #[test]
    fn test_failed_reload_reports_and_keeps_config() {
        let images = ReloadableImageConfig::new(test_image_config());
        let before = images.current();
        let mut file = NamedTempFile::new().expect("create temp file");
        write!(file, "apiVersion: config.k8ssandra.io/v1beta1\nkind: ImageConfig\nimageRegistery: typo.io\n")
            .expect("write temp file");

        assert!(!reload_image_config(&images, file.path()));
        assert_eq!(images.current(), before);
    }
}
