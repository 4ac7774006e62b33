//! Cass Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions and shared labels for the
//! datacenter controller.

pub mod cassandra_datacenter;
pub mod labels;
pub mod server_type;

pub use cassandra_datacenter::*;
pub use labels::*;
pub use server_type::*;
