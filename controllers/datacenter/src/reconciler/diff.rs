//! Convergence of managed Services against the resource store.
//!
//! Each desired Service is looked up; missing ones are collected into a
//! creation batch, changed ones are updated in place, unchanged ones are left
//! alone. After a batch of creations the whole check runs again, at most
//! [`MAX_SERVICE_CHECK_PASSES`] times.

use super::hash::resources_have_same_hash;
use super::progress::update_progress;
use super::result::{ReconcileResult, ReconcileStep};
use super::services::build_services;
use super::ReconcileContext;
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::ProgressState;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use resource_store::{EventKind, StoreError};
use tracing::{debug, error, info};

/// Upper bound on check phases within one pass.
pub const MAX_SERVICE_CHECK_PASSES: usize = 3;

/// Event reason recorded for every Service the controller creates.
pub const CREATED_RESOURCE_REASON: &str = "CreatedResource";

/// Pipeline step converging the datacenter's Services.
pub struct CheckServices;

#[async_trait]
impl ReconcileStep for CheckServices {
    fn name(&self) -> &'static str {
        "check_services"
    }

    async fn run(&self, ctx: &ReconcileContext<'_>) -> ReconcileResult {
        let desired = match build_services(ctx.dc) {
            Ok(desired) => desired,
            Err(e) => return ReconcileResult::Error(e.into()),
        };
        reconcile_services(ctx, desired).await.into()
    }
}

/// Converges the store to `desired`.
///
/// Stamps the controller reference, then alternates check and create phases
/// until nothing is missing. Fails with `ServiceCheckExhausted` if Services are
/// still missing after the last allowed check.
pub async fn reconcile_services(ctx: &ReconcileContext<'_>, mut desired: Vec<Service>) -> Result<(), ControllerError> {
    for service in &mut desired {
        set_controller_reference(service, &ctx.owner_ref);
    }

    let mut pass = 1;
    loop {
        let create_needed = check_services(ctx, &desired).await?;
        if create_needed.is_empty() {
            debug!("All {} services present for {}", desired.len(), ctx.key());
            return Ok(());
        }

        if pass >= MAX_SERVICE_CHECK_PASSES {
            let missing: Vec<String> = create_needed.iter().map(|s| service_name(s).to_string()).collect();
            error!(
                "Services for {} still missing after {} check passes: {:?}",
                ctx.key(),
                pass,
                missing
            );
            return Err(ControllerError::ServiceCheckExhausted { passes: pass, missing });
        }

        create_services(ctx, &create_needed).await?;
        pass += 1;
    }
}

/// Check phase: updates drifted Services and returns the ones that do not exist.
///
/// Any lookup failure other than not-found, and any update failure, aborts the
/// phase.
pub async fn check_services<'s>(
    ctx: &ReconcileContext<'_>,
    desired: &'s [Service],
) -> Result<Vec<&'s Service>, ControllerError> {
    let mut create_needed = Vec::new();

    for service in desired {
        ctx.ensure_active()?;
        let name = service_name(service);

        let observed = match ctx.store.get_service(&ctx.namespace, name).await {
            Ok(observed) => observed,
            Err(StoreError::NotFound(_)) => {
                debug!("Service {}/{} not found, will create", ctx.namespace, name);
                create_needed.push(service);
                continue;
            }
            Err(e) => {
                error!("Failed to look up service {}/{}: {}", ctx.namespace, name, e);
                return Err(e.into());
            }
        };

        if resources_have_same_hash(&observed, service) {
            debug!("Service {}/{} unchanged", ctx.namespace, name);
            continue;
        }

        let update = merge_platform_fields(service, &observed);
        ctx.ensure_active()?;
        info!("Updating service {}/{}", ctx.namespace, name);
        ctx.store.update_service(&update).await.map_err(|e| {
            error!("Failed to update service {}/{}: {}", ctx.namespace, name, e);
            ControllerError::from(e)
        })?;
    }

    Ok(create_needed)
}

/// Create phase: marks the datacenter `Updating`, then creates every Service in
/// `services`, recording one event per creation.
pub async fn create_services(ctx: &ReconcileContext<'_>, services: &[&Service]) -> Result<(), ControllerError> {
    update_progress(ctx, ProgressState::Updating).await?;

    for service in services {
        ctx.ensure_active()?;
        let name = service_name(service);
        info!("Creating service {}/{}", ctx.namespace, name);
        ctx.store.create_service(service).await.map_err(|e| {
            error!("Failed to create service {}/{}: {}", ctx.namespace, name, e);
            ControllerError::from(e)
        })?;
        ctx.events
            .record(
                &ctx.object_ref,
                EventKind::Normal,
                CREATED_RESOURCE_REASON,
                &format!("Created service {name}"),
            )
            .await;
    }

    Ok(())
}

/// Builds the object to send as an update.
///
/// Starts from `desired`, attaches the observed concurrency token and copies
/// forward every platform-allocated field the desired object leaves unset.
#[must_use]
pub fn merge_platform_fields(desired: &Service, observed: &Service) -> Service {
    let mut merged = desired.clone();
    merged.metadata.resource_version = observed.metadata.resource_version.clone();

    let (Some(spec), Some(observed_spec)) = (merged.spec.as_mut(), observed.spec.as_ref()) else {
        return merged;
    };

    if spec.cluster_ip.is_none() {
        spec.cluster_ip = observed_spec.cluster_ip.clone();
    }
    if spec.cluster_ips.is_none() {
        spec.cluster_ips = observed_spec.cluster_ips.clone();
    }
    if spec.ip_families.is_none() {
        spec.ip_families = observed_spec.ip_families.clone();
    }
    if spec.ip_family_policy.is_none() {
        spec.ip_family_policy = observed_spec.ip_family_policy.clone();
    }
    if spec.health_check_node_port.is_none() {
        spec.health_check_node_port = observed_spec.health_check_node_port;
    }

    let observed_ports = observed_spec.ports.as_deref().unwrap_or_default();
    for port in spec.ports.iter_mut().flatten() {
        if port.node_port.is_none() {
            port.node_port = observed_ports
                .iter()
                .find(|p| p.name == port.name)
                .and_then(|p| p.node_port);
        }
    }

    merged
}

fn set_controller_reference(service: &mut Service, owner: &OwnerReference) {
    let refs = service.metadata.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.controller != Some(true));
    refs.push(owner.clone());
}

fn service_name(service: &Service) -> &str {
    service.metadata.name.as_deref().unwrap_or_default()
}
