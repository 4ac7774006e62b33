//! Controller-specific error types.
//!
//! Wraps the errors of the store, image and configuration layers and adds the
//! failure modes that only exist inside a reconcile pass.

use images::{ConfigError, ImageError};
use kube::Error as KubeError;
use resource_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the datacenter controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error outside the resource store
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Lookup or write of a managed resource failed
    #[error("Resource store error: {0}")]
    Store(#[from] StoreError),

    /// Image could not be resolved for the datacenter
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Image configuration missing or malformed
    #[error("Image config error: {0}")]
    Config(#[from] ConfigError),

    /// Desired resource could not be serialized for hashing
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Datacenter cannot act as owner (no name or UID yet)
    #[error("Cannot build owner reference for CassandraDatacenter {0}")]
    MissingOwnerReference(String),

    /// Services still missing after the bounded number of check passes
    #[error("Services still missing after {passes} check passes: {missing:?}")]
    ServiceCheckExhausted {
        /// Check passes performed
        passes: usize,
        /// Services that still did not exist
        missing: Vec<String>,
    },

    /// The pass was cancelled before finishing
    #[error("Reconcile pass cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
