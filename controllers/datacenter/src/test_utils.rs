//! Test utilities for unit testing reconcilers
//!
//! Helpers for building datacenters and a reconcile context wired to the
//! in-memory store and event sink.

use crate::reconciler::ReconcileContext;
use crds::{CassandraDatacenter, CassandraDatacenterSpec, NetworkingConfig, NodePortConfig, ServerType};
use images::{IMAGE_CONFIG_API_VERSION, IMAGE_CONFIG_KIND, ImageConfig, ImageResolver, Images};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use resource_store::{MockEventSink, MockResourceStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cassandra 4.1.0 datacenter in cluster `cluster1`
pub fn create_test_datacenter(name: &str, namespace: &str) -> CassandraDatacenter {
    CassandraDatacenter {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{name}")),
            ..Default::default()
        },
        spec: CassandraDatacenterSpec {
            cluster_name: "cluster1".to_string(),
            server_type: ServerType::Cassandra,
            server_version: "4.1.0".to_string(),
            ..Default::default()
        },
        status: None,
    }
}

/// DSE datacenter running `version`
pub fn create_test_dse_datacenter(name: &str, namespace: &str, version: &str) -> CassandraDatacenter {
    let mut dc = create_test_datacenter(name, namespace);
    dc.spec.server_type = ServerType::Dse;
    dc.spec.server_version = version.to_string();
    dc
}

/// Datacenter with node-port exposure and additional seeds enabled
pub fn create_test_datacenter_with_all_services(name: &str, namespace: &str) -> CassandraDatacenter {
    let mut dc = create_test_datacenter(name, namespace);
    dc.spec.additional_seeds = vec!["10.1.0.1".to_string()];
    dc.spec.networking = Some(NetworkingConfig {
        node_port: Some(NodePortConfig {
            native: 30042,
            native_ssl: 0,
            internode: 0,
            internode_ssl: 30701,
        }),
    });
    dc
}

/// Image configuration with every auxiliary image set and no registry
pub fn test_image_config() -> ImageConfig {
    ImageConfig {
        api_version: IMAGE_CONFIG_API_VERSION.to_string(),
        kind: IMAGE_CONFIG_KIND.to_string(),
        images: Images {
            system_logger: "k8ssandra/system-logger:latest".to_string(),
            config_builder: "datastax/cass-config-builder:1.0-ubi".to_string(),
            k8ssandra_client: "k8ssandra/k8ssandra-client:v0.2.2".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// In-memory collaborators for one test
pub struct TestHarness {
    pub store: MockResourceStore,
    pub events: MockEventSink,
    pub images: ImageResolver,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_images(test_image_config())
    }

    pub fn with_images(config: ImageConfig) -> Self {
        Self {
            store: MockResourceStore::new(),
            events: MockEventSink::new(),
            images: ImageResolver::new(Arc::new(config)),
        }
    }

    /// Context for a pass over `dc` with a fresh cancellation token
    pub fn context<'a>(&'a self, dc: &'a CassandraDatacenter) -> ReconcileContext<'a> {
        ReconcileContext::new(dc, &self.store, &self.events, self.images.clone(), CancellationToken::new())
            .expect("test datacenter has name, namespace and uid")
    }
}
