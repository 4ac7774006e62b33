//! Container image resolution
//!
//! Maps a datacenter's (server type, version) to a fully qualified image
//! reference, driven by an immutable [`ImageConfig`] loaded once at startup.
//!
//! Resolution order, first match wins:
//! 1. per-version override from the configuration (used verbatim)
//! 2. accepted-version pattern check for the server type
//! 3. `repository:version[suffix]` from the configured or built-in defaults
//!
//! Every result goes through registry rewriting when a custom registry is
//! configured.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use crds::ServerType;
//! use images::{ImageConfig, ImageResolver};
//!
//! let config = ImageConfig::from_yaml(r#"
//! apiVersion: config.k8ssandra.io/v1beta1
//! kind: ImageConfig
//! imageRegistry: my.registry.io
//! "#).unwrap();
//! let resolver = ImageResolver::new(Arc::new(config));
//! assert_eq!(
//!     resolver.resolve(ServerType::Cassandra, "4.1.0").unwrap(),
//!     "my.registry.io/k8ssandra/cass-management-api:4.1.0",
//! );
//! ```

pub mod config;
pub mod error;
pub mod reloadable;
pub mod resolver;

pub use config::{
    DefaultImages, IMAGE_CONFIG_API_VERSION, IMAGE_CONFIG_KIND, ImageComponent, ImageConfig, ImagePullSecret, Images,
};
pub use error::{ConfigError, ImageError};
pub use reloadable::ReloadableImageConfig;
pub use resolver::{AuxiliaryImage, ImageResolver, is_version_supported, strip_registry};
