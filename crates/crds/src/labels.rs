//! Well-known label and annotation keys stamped on managed resources.

/// Marks every object created by this operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY_VALUE: &str = "cass-operator";

/// Sanitised cluster name
pub const CLUSTER_LABEL: &str = "cassandra.datastax.com/cluster";

/// Sanitised datacenter name
pub const DATACENTER_LABEL: &str = "cassandra.datastax.com/datacenter";

/// Set to `"true"` on pods acting as seeds
pub const SEED_NODE_LABEL: &str = "cassandra.datastax.com/seed-node";

/// Canonical content hash of the desired object
pub const RESOURCE_HASH_ANNOTATION: &str = "k8ssandra.io/resource-hash";
