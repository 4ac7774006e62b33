//! Image configuration and resolution errors

use crds::ServerType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors loading the image configuration document. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("could not read image config at {}: {source}", path.display())]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid YAML for the expected shape
    #[error("could not decode image config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Document decoded but has the wrong apiVersion or kind
    #[error("invalid image config: {0}")]
    Schema(String),
}

/// Errors resolving an image reference
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    /// No override exists and the version fails the server type's pattern
    #[error("server '{server_type}' and version '{version}' do not work together")]
    UnsupportedVersion {
        /// Requested server type
        server_type: ServerType,
        /// Requested version
        version: String,
    },

    /// An auxiliary image was requested but the configuration has no entry for it
    #[error("auxiliary image '{0}' is not configured")]
    AuxiliaryNotConfigured(&'static str),
}
