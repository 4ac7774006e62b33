//! Image configuration document
//!
//! Decoded from a schema-versioned YAML file, typically mounted from a ConfigMap:
//!
//! ```yaml
//! apiVersion: config.k8ssandra.io/v1beta1
//! kind: ImageConfig
//! imageRegistry: "localhost:5000"
//! imagePullSecret:
//!   name: my-secret-name
//! defaults:
//!   cassandra:
//!     repository: "k8ssandra/cass-management-api"
//!   dse:
//!     repository: "datastax/dse-server"
//!     suffix: "-ubi"
//! images:
//!   system-logger: "k8ssandra/system-logger:latest"
//!   config-builder: "datastax/cass-config-builder:1.0-ubi"
//!   k8ssandra-client: "k8ssandra/k8ssandra-client:v0.2.2"
//!   cassandra:
//!     "4.0.0": "k8ssandra/cassandra-ubi:latest"
//!   dse:
//!     "6.8.999": "datastax/dse-server-prototype:latest"
//! ```
//!
//! The value is never mutated after decoding; see
//! [`crate::ReloadableImageConfig`] for whole-value replacement.

use crate::error::ConfigError;
use crds::ServerType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Only accepted `apiVersion`
pub const IMAGE_CONFIG_API_VERSION: &str = "config.k8ssandra.io/v1beta1";

/// Only accepted `kind`
pub const IMAGE_CONFIG_KIND: &str = "ImageConfig";

/// Process-wide image configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageConfig {
    /// Must equal [`IMAGE_CONFIG_API_VERSION`]
    pub api_version: String,

    /// Must equal [`IMAGE_CONFIG_KIND`]
    pub kind: String,

    /// Registry prepended to every resolved image (empty = no rewrite)
    #[serde(default)]
    pub image_registry: String,

    /// Pull secret injected into pod specs
    #[serde(default)]
    pub image_pull_secret: ImagePullSecret,

    /// Default repository/suffix per server type
    #[serde(default, rename = "defaults")]
    pub default_images: DefaultImages,

    /// Explicit images: auxiliaries and per-version overrides
    #[serde(default)]
    pub images: Images,
}

/// Reference to an image pull secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagePullSecret {
    /// Secret name (empty = none)
    #[serde(default)]
    pub name: String,
}

/// Default image components per server type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultImages {
    /// Used for `cassandra`
    #[serde(default, rename = "cassandra")]
    pub cassandra_image_component: ImageComponent,

    /// Used for `dse`
    #[serde(default, rename = "dse")]
    pub dse_image_component: ImageComponent,
}

/// Repository and tag suffix used to compose `repository:version[suffix]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageComponent {
    /// Image repository; empty falls back to the built-in default
    #[serde(default)]
    pub repository: String,

    /// Appended to the version tag
    #[serde(default)]
    pub suffix: String,
}

/// Auxiliary images and per-version overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Images {
    /// Log tailing sidecar
    #[serde(default, rename = "system-logger")]
    pub system_logger: String,

    /// Init container rendering server configuration
    #[serde(default, rename = "config-builder")]
    pub config_builder: String,

    /// Client tooling image
    #[serde(default, rename = "k8ssandra-client")]
    pub k8ssandra_client: String,

    /// Cassandra version -> image
    #[serde(default, rename = "cassandra")]
    pub cassandra_versions: BTreeMap<String, String>,

    /// DSE version -> image
    #[serde(default, rename = "dse")]
    pub dse_versions: BTreeMap<String, String>,
}

impl ImageConfig {
    /// Decode and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: ImageConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, decode and validate the document at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        info!("Loaded image config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != IMAGE_CONFIG_API_VERSION {
            return Err(ConfigError::Schema(format!(
                "unsupported apiVersion '{}', expected '{}'",
                self.api_version, IMAGE_CONFIG_API_VERSION
            )));
        }
        if self.kind != IMAGE_CONFIG_KIND {
            return Err(ConfigError::Schema(format!(
                "unsupported kind '{}', expected '{}'",
                self.kind, IMAGE_CONFIG_KIND
            )));
        }
        Ok(())
    }

    /// Per-version override for a server type, if configured.
    #[must_use]
    pub fn version_override(&self, server_type: ServerType, version: &str) -> Option<&str> {
        let versions = match server_type {
            ServerType::Cassandra => &self.images.cassandra_versions,
            ServerType::Dse => &self.images.dse_versions,
        };
        versions.get(version).map(String::as_str)
    }

    /// Configured default component for a server type.
    #[must_use]
    pub fn default_component(&self, server_type: ServerType) -> &ImageComponent {
        match server_type {
            ServerType::Cassandra => &self.default_images.cassandra_image_component,
            ServerType::Dse => &self.default_images.dse_image_component,
        }
    }
}
