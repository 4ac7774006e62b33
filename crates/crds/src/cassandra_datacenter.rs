//! CassandraDatacenter Custom Resource Definition
//!
//! One deployment unit of a managed Cassandra/DSE cluster. The controller derives
//! every Service it manages from this spec.

use crate::labels::{CLUSTER_LABEL, DATACENTER_LABEL, MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::server_type::ServerType;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CassandraDatacenterSpec defines the desired state of a datacenter
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "cassandra.datastax.com",
    version = "v1beta1",
    kind = "CassandraDatacenter",
    shortname = "cassdc",
    namespaced,
    status = "CassandraDatacenterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraDatacenterSpec {
    /// Name of the cluster this datacenter belongs to
    pub cluster_name: String,

    /// Datacenter name as seen by the database (defaults to `metadata.name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter_name: Option<String>,

    /// Server distribution
    pub server_type: ServerType,

    /// Server version, e.g. "4.1.0" or "6.8.5"
    pub server_version: String,

    /// Explicit server image; bypasses image resolution when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_image: Option<String>,

    /// Network exposure settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<NetworkingConfig>,

    /// Seeds outside this datacenter (cross-cluster seed exposure)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_seeds: Vec<String>,
}

/// Network exposure of the datacenter
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingConfig {
    /// Expose pods through a NodePort service when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<NodePortConfig>,
}

/// Node ports for the NodePort service. Zero leaves allocation to the platform.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePortConfig {
    /// CQL native protocol
    #[serde(default)]
    pub native: i32,

    /// CQL native protocol over TLS
    #[serde(default, rename = "nativeSSL")]
    pub native_ssl: i32,

    /// Internode messaging
    #[serde(default)]
    pub internode: i32,

    /// Internode messaging over TLS
    #[serde(default, rename = "internodeSSL")]
    pub internode_ssl: i32,
}

/// Coarse progress indicator maintained by the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ProgressState {
    /// Not reconciled yet
    #[default]
    Pending,

    /// The controller is creating or changing resources
    Updating,

    /// All managed resources converged
    Ready,
}

/// Observed state of a datacenter
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CassandraDatacenterStatus {
    /// Last progress recorded by the controller
    #[serde(default)]
    pub cassandra_operator_progress: ProgressState,
}

impl CassandraDatacenter {
    /// Raw datacenter name: the spec override if present, else the object name.
    #[must_use]
    pub fn datacenter_name(&self) -> &str {
        self.spec
            .datacenter_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.metadata.name.as_deref())
            .unwrap_or_default()
    }

    /// Cluster name sanitised for use in object names and label values.
    #[must_use]
    pub fn sanitized_cluster_name(&self) -> String {
        cleanup_for_kubernetes(&self.spec.cluster_name)
    }

    /// Datacenter name sanitised for use in object names and label values.
    #[must_use]
    pub fn sanitized_datacenter_name(&self) -> String {
        cleanup_for_kubernetes(self.datacenter_name())
    }

    /// Whether a NodePort service should expose this datacenter.
    #[must_use]
    pub fn is_node_port_enabled(&self) -> bool {
        self.node_port_config().is_some()
    }

    /// NodePort settings, if node-port exposure is enabled.
    #[must_use]
    pub fn node_port_config(&self) -> Option<&NodePortConfig> {
        self.spec.networking.as_ref().and_then(|n| n.node_port.as_ref())
    }

    /// Current progress, `Pending` when no status has been written yet.
    #[must_use]
    pub fn progress(&self) -> ProgressState {
        self.status
            .as_ref()
            .map(|s| s.cassandra_operator_progress)
            .unwrap_or_default()
    }

    /// Labels shared by every object belonging to the cluster.
    #[must_use]
    pub fn cluster_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
            (CLUSTER_LABEL.to_string(), self.sanitized_cluster_name()),
        ])
    }

    /// Labels identifying objects of this datacenter.
    #[must_use]
    pub fn datacenter_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.cluster_labels();
        labels.insert(DATACENTER_LABEL.to_string(), self.sanitized_datacenter_name());
        labels
    }

    /// Selector matching pods of this datacenter (no managed-by key).
    #[must_use]
    pub fn datacenter_selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (CLUSTER_LABEL.to_string(), self.sanitized_cluster_name()),
            (DATACENTER_LABEL.to_string(), self.sanitized_datacenter_name()),
        ])
    }

    /// Client-facing service name: `<cluster>-<dc>-service`.
    #[must_use]
    pub fn datacenter_service_name(&self) -> String {
        format!("{}-{}-service", self.sanitized_cluster_name(), self.sanitized_datacenter_name())
    }

    /// Seed discovery service name: `<cluster>-seed-service`.
    #[must_use]
    pub fn seed_service_name(&self) -> String {
        format!("{}-seed-service", self.sanitized_cluster_name())
    }

    /// All-pods service name: `<cluster>-<dc>-all-pods-service`.
    #[must_use]
    pub fn all_pods_service_name(&self) -> String {
        format!("{}-{}-all-pods-service", self.sanitized_cluster_name(), self.sanitized_datacenter_name())
    }

    /// Additional seed service name: `<cluster>-<dc>-additional-seed-service`.
    #[must_use]
    pub fn additional_seed_service_name(&self) -> String {
        format!(
            "{}-{}-additional-seed-service",
            self.sanitized_cluster_name(),
            self.sanitized_datacenter_name()
        )
    }

    /// NodePort service name: `<cluster>-<dc>-node-port-service`.
    #[must_use]
    pub fn node_port_service_name(&self) -> String {
        format!("{}-{}-node-port-service", self.sanitized_cluster_name(), self.sanitized_datacenter_name())
    }
}

/// Turns an arbitrary name into a DNS-1123 friendly fragment.
///
/// Lower-cases ASCII letters, maps `_`, `.` and whitespace to `-` and drops
/// anything else outside `[a-z0-9-]`. Leading and trailing dashes are trimmed.
#[must_use]
pub fn cleanup_for_kubernetes(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => Some(c),
            'A'..='Z' => Some(c.to_ascii_lowercase()),
            '_' | '.' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect();
    cleaned.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn datacenter(cluster: &str, name: &str) -> CassandraDatacenter {
        CassandraDatacenter {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("cass".to_string()),
                ..Default::default()
            },
            spec: CassandraDatacenterSpec {
                cluster_name: cluster.to_string(),
                server_version: "4.1.0".to_string(),
                ..Default::default()
            },
            status: None,
        }
    }

    #[test]
    fn test_cleanup_for_kubernetes() {
        assert_eq!(cleanup_for_kubernetes("My_Cluster"), "my-cluster");
        assert_eq!(cleanup_for_kubernetes("prod cluster.1"), "prod-cluster-1");
        assert_eq!(cleanup_for_kubernetes("--ok!--"), "ok");
    }

    #[test]
    fn test_service_names() {
        let dc = datacenter("Cluster1", "dc1");
        assert_eq!(dc.datacenter_service_name(), "cluster1-dc1-service");
        assert_eq!(dc.seed_service_name(), "cluster1-seed-service");
        assert_eq!(dc.all_pods_service_name(), "cluster1-dc1-all-pods-service");
        assert_eq!(dc.additional_seed_service_name(), "cluster1-dc1-additional-seed-service");
        assert_eq!(dc.node_port_service_name(), "cluster1-dc1-node-port-service");
    }

    #[test]
    fn test_datacenter_name_override() {
        let mut dc = datacenter("c", "dc1");
        dc.spec.datacenter_name = Some("East_1".to_string());
        assert_eq!(dc.datacenter_name(), "East_1");
        assert_eq!(dc.sanitized_datacenter_name(), "east-1");

        dc.spec.datacenter_name = Some(String::new());
        assert_eq!(dc.datacenter_name(), "dc1");
    }

    #[test]
    fn test_node_port_enabled() {
        let mut dc = datacenter("c", "dc1");
        assert!(!dc.is_node_port_enabled());

        dc.spec.networking = Some(NetworkingConfig { node_port: None });
        assert!(!dc.is_node_port_enabled());

        dc.spec.networking = Some(NetworkingConfig {
            node_port: Some(NodePortConfig { native: 30042, ..Default::default() }),
        });
        assert!(dc.is_node_port_enabled());
    }

    #[test]
    fn test_progress_defaults_to_pending() {
        let mut dc = datacenter("c", "dc1");
        assert_eq!(dc.progress(), ProgressState::Pending);
        dc.status = Some(CassandraDatacenterStatus {
            cassandra_operator_progress: ProgressState::Ready,
        });
        assert_eq!(dc.progress(), ProgressState::Ready);
    }

    #[test]
    fn test_spec_deserializes_from_camel_case() {
        let spec: CassandraDatacenterSpec = serde_json::from_value(serde_json::json!({
            "clusterName": "cluster1",
            "serverType": "dse",
            "serverVersion": "6.8.5",
            "networking": { "nodePort": { "native": 30042, "internodeSSL": 30701 } },
            "additionalSeeds": ["10.1.0.1"]
        }))
        .expect("valid spec");
        assert_eq!(spec.server_type, ServerType::Dse);
        let node_port = spec.networking.and_then(|n| n.node_port).expect("node port set");
        assert_eq!(node_port.native, 30042);
        assert_eq!(node_port.internode_ssl, 30701);
        assert_eq!(node_port.internode, 0);
        assert_eq!(spec.additional_seeds, vec!["10.1.0.1".to_string()]);
    }
}
