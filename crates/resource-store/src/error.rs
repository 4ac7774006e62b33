//! Resource store errors

use thiserror::Error;

/// Errors that can occur when reading or writing managed resources
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist (the one outcome callers treat as non-fatal)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale concurrency token or object already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller lacks permission for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// API server rejected the request for any other reason
    #[error("API error: {0}")]
    Api(String),

    /// Object cannot be written as given (e.g. missing name or namespace)
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Transport or client-side Kubernetes error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Classifies a kube error by HTTP status; `what` names the object involved.
    #[must_use]
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 404 => StoreError::NotFound(what.to_string()),
            kube::Error::Api(ref resp) if resp.code == 409 => {
                StoreError::Conflict(format!("{}: {}", what, resp.message))
            }
            kube::Error::Api(ref resp) if resp.code == 403 => {
                StoreError::Forbidden(format!("{}: {}", what, resp.message))
            }
            other => StoreError::Kube(other),
        }
    }

    /// Whether this error means the object is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
