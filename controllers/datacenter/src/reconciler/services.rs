//! Desired Service topology of a datacenter.
//!
//! Every function here is pure: the same datacenter always produces the same
//! Services, in the same order, with the same hash annotation.

use super::hash::add_hash_annotation;
use crds::{CassandraDatacenter, CLUSTER_LABEL, NodePortConfig, SEED_NODE_LABEL, ServerType};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub const NATIVE_PORT: i32 = 9042;
pub const NATIVE_SSL_PORT: i32 = 9142;
pub const INTERNODE_PORT: i32 = 7000;
pub const INTERNODE_SSL_PORT: i32 = 7001;
pub const MGMT_API_PORT: i32 = 8080;
pub const PROMETHEUS_PORT: i32 = 9103;
pub const METRICS_PORT: i32 = 9000;
pub const DSE_THRIFT_PORT: i32 = 9160;
pub const DSE_INTERNODE_MSG_PORT: i32 = 8609;

const HEADLESS: &str = "None";

/// Builds every Service the datacenter needs, stamped with its content hash.
///
/// Order: client service, seed service, all-pods service, then the optional
/// additional-seed and node-port services.
pub fn build_services(dc: &CassandraDatacenter) -> Result<Vec<Service>, serde_json::Error> {
    let mut services = vec![datacenter_service(dc), seed_service(dc), all_pods_service(dc)];
    if !dc.spec.additional_seeds.is_empty() {
        services.push(additional_seed_service(dc));
    }
    if let Some(node_port) = dc.node_port_config() {
        services.push(node_port_service(dc, node_port));
    }
    for service in &mut services {
        add_hash_annotation(service)?;
    }
    Ok(services)
}

/// Client-facing headless service selecting the datacenter's pods.
#[must_use]
pub fn datacenter_service(dc: &CassandraDatacenter) -> Service {
    let mut ports = vec![
        named_port("native", NATIVE_PORT),
        named_port("tls-native", NATIVE_SSL_PORT),
        named_port("mgmt-api", MGMT_API_PORT),
        named_port("prometheus", PROMETHEUS_PORT),
        named_port("metrics", METRICS_PORT),
    ];
    if dc.spec.server_type == ServerType::Dse {
        ports.push(named_port("thrift", DSE_THRIFT_PORT));
        ports.push(named_port("internode-msg", DSE_INTERNODE_MSG_PORT));
    }

    service(
        dc,
        dc.datacenter_service_name(),
        dc.datacenter_labels(),
        ServiceSpec {
            cluster_ip: Some(HEADLESS.to_string()),
            selector: Some(dc.datacenter_selector()),
            ports: Some(ports),
            ..Default::default()
        },
    )
}

/// Cluster-wide seed discovery service. Lists seeds before they are ready.
#[must_use]
pub fn seed_service(dc: &CassandraDatacenter) -> Service {
    let selector = BTreeMap::from([
        (CLUSTER_LABEL.to_string(), dc.sanitized_cluster_name()),
        (SEED_NODE_LABEL.to_string(), "true".to_string()),
    ]);

    service(
        dc,
        dc.seed_service_name(),
        dc.cluster_labels(),
        ServiceSpec {
            cluster_ip: Some(HEADLESS.to_string()),
            publish_not_ready_addresses: Some(true),
            selector: Some(selector),
            ..Default::default()
        },
    )
}

/// Headless service listing every pod of the datacenter, ready or not.
#[must_use]
pub fn all_pods_service(dc: &CassandraDatacenter) -> Service {
    service(
        dc,
        dc.all_pods_service_name(),
        dc.datacenter_labels(),
        ServiceSpec {
            cluster_ip: Some(HEADLESS.to_string()),
            publish_not_ready_addresses: Some(true),
            selector: Some(dc.datacenter_selector()),
            ports: Some(vec![
                named_port("native", NATIVE_PORT),
                named_port("mgmt-api", MGMT_API_PORT),
                named_port("prometheus", PROMETHEUS_PORT),
                named_port("metrics", METRICS_PORT),
            ]),
            ..Default::default()
        },
    )
}

/// Selector-less headless service whose endpoints point at external seeds.
#[must_use]
pub fn additional_seed_service(dc: &CassandraDatacenter) -> Service {
    service(
        dc,
        dc.additional_seed_service_name(),
        dc.datacenter_labels(),
        ServiceSpec {
            cluster_ip: Some(HEADLESS.to_string()),
            publish_not_ready_addresses: Some(true),
            ..Default::default()
        },
    )
}

/// NodePort service exposing internode and native traffic on every node.
#[must_use]
pub fn node_port_service(dc: &CassandraDatacenter, config: &NodePortConfig) -> Service {
    let mut ports = vec![
        node_port("internode", INTERNODE_PORT, config.internode),
        node_port("native", NATIVE_PORT, config.native),
    ];
    if config.internode_ssl != 0 {
        ports.push(node_port("internode-ssl", INTERNODE_SSL_PORT, config.internode_ssl));
    }
    if config.native_ssl != 0 {
        ports.push(node_port("native-ssl", NATIVE_SSL_PORT, config.native_ssl));
    }

    service(
        dc,
        dc.node_port_service_name(),
        dc.datacenter_labels(),
        ServiceSpec {
            type_: Some("NodePort".to_string()),
            selector: Some(dc.datacenter_selector()),
            ports: Some(ports),
            ..Default::default()
        },
    )
}

fn service(
    dc: &CassandraDatacenter,
    name: String,
    labels: BTreeMap<String, String>,
    spec: ServiceSpec,
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: dc.metadata.namespace.clone(),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(spec),
        ..Default::default()
    }
}

fn named_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

// Zero leaves the node port to the platform.
fn node_port(name: &str, port: i32, node_port: i32) -> ServicePort {
    ServicePort {
        node_port: (node_port != 0).then_some(node_port),
        ..named_port(name, port)
    }
}
