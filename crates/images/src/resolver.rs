//! Image reference resolution and registry rewriting.

use crate::config::ImageConfig;
use crate::error::ImageError;
use crds::{CassandraDatacenter, ServerType};
use k8s_openapi::api::core::v1::{LocalObjectReference, PodSpec};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Used when no default component is configured for `cassandra`
pub const DEFAULT_CASSANDRA_REPOSITORY: &str = "k8ssandra/cass-management-api";

/// Used when no default component is configured for `dse`
pub const DEFAULT_DSE_REPOSITORY: &str = "datastax/dse-server";

// Anchored at the start only so pre-release tags like `4.1.0-rc1` still pass.
#[allow(clippy::expect_used, reason = "constant pattern")]
static DSE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(6\.8\.\d+|7\.\d+\.\d+)").expect("valid DSE version pattern"));

#[allow(clippy::expect_used, reason = "constant pattern")]
static OSS_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(3\.11\.\d+|4\.\d+\.\d+|5\.\d+\.\d+)").expect("valid Cassandra version pattern")
});

/// Whether `version` is an accepted version for `server_type`.
///
/// - `dse`: `6.8.x`, `7.x.x`
/// - `cassandra`: `3.11.x`, `4.x.x`, `5.x.x`
#[must_use]
pub fn is_version_supported(server_type: ServerType, version: &str) -> bool {
    match server_type {
        ServerType::Dse => DSE_VERSION.is_match(version),
        ServerType::Cassandra => OSS_VERSION.is_match(version),
    }
}

/// Strips a leading registry host from an image reference.
///
/// The first `/`-separated segment counts as a registry host when it contains
/// `.` or `:` and at least one more segment follows.
#[must_use]
pub fn strip_registry(image: &str) -> &str {
    match image.split_once('/') {
        Some((first, rest)) if first.contains('.') || first.contains(':') => rest,
        _ => image,
    }
}

/// Fixed auxiliary images carried in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxiliaryImage {
    /// `images.system-logger`
    SystemLogger,
    /// `images.config-builder`
    ConfigBuilder,
    /// `images.k8ssandra-client`
    K8ssandraClient,
}

impl AuxiliaryImage {
    /// Key of the image in the configuration document.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AuxiliaryImage::SystemLogger => "system-logger",
            AuxiliaryImage::ConfigBuilder => "config-builder",
            AuxiliaryImage::K8ssandraClient => "k8ssandra-client",
        }
    }
}

/// Resolves image references against one immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    config: Arc<ImageConfig>,
}

impl ImageResolver {
    /// Creates a resolver over a configuration snapshot.
    #[must_use]
    pub fn new(config: Arc<ImageConfig>) -> Self {
        Self { config }
    }

    /// Configuration this resolver reads.
    #[must_use]
    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Resolves the server image for `(server_type, version)`.
    ///
    /// A configured per-version override wins, even when the version would also
    /// pass validation. Otherwise the version must be supported and the image is
    /// composed as `repository:version[suffix]`.
    pub fn resolve(&self, server_type: ServerType, version: &str) -> Result<String, ImageError> {
        if let Some(image) = self.config.version_override(server_type, version) {
            debug!("Using configured {} image override for version {}: {}", server_type, version, image);
            return Ok(self.apply_registry(image));
        }

        if !is_version_supported(server_type, version) {
            return Err(ImageError::UnsupportedVersion {
                server_type,
                version: version.to_string(),
            });
        }

        let (repository, suffix) = self.image_components(server_type);
        Ok(self.apply_registry(&format!("{repository}:{version}{suffix}")))
    }

    /// Resolves the server image for a datacenter.
    ///
    /// A non-empty `spec.serverImage` is returned verbatim.
    pub fn resolve_for_datacenter(&self, dc: &CassandraDatacenter) -> Result<String, ImageError> {
        match dc.spec.server_image.as_deref() {
            Some(image) if !image.is_empty() => Ok(image.to_string()),
            _ => self.resolve(dc.spec.server_type, &dc.spec.server_version),
        }
    }

    /// Resolves one of the fixed auxiliary images.
    pub fn resolve_auxiliary(&self, image: AuxiliaryImage) -> Result<String, ImageError> {
        let images = &self.config.images;
        let configured = match image {
            AuxiliaryImage::SystemLogger => &images.system_logger,
            AuxiliaryImage::ConfigBuilder => &images.config_builder,
            AuxiliaryImage::K8ssandraClient => &images.k8ssandra_client,
        };
        if configured.is_empty() {
            return Err(ImageError::AuxiliaryNotConfigured(image.name()));
        }
        Ok(self.apply_registry(configured))
    }

    /// Rewrites `image` to pull from the configured registry, if any.
    #[must_use]
    pub fn apply_registry(&self, image: &str) -> String {
        let registry = self.config.image_registry.trim_end_matches('/');
        if registry.is_empty() {
            image.to_string()
        } else {
            format!("{}/{}", registry, strip_registry(image))
        }
    }

    /// Appends the configured pull secret to `pod_spec`.
    ///
    /// Returns whether a secret was added. Callers invoke this once per template
    /// build; repeated calls on the same spec append duplicates.
    pub fn add_image_pull_secrets(&self, pod_spec: &mut PodSpec) -> bool {
        let secret_name = &self.config.image_pull_secret.name;
        if secret_name.is_empty() {
            return false;
        }
        pod_spec
            .image_pull_secrets
            .get_or_insert_with(Vec::new)
            .push(LocalObjectReference {
                name: secret_name.clone().into(),
            });
        true
    }

    fn image_components(&self, server_type: ServerType) -> (&str, &str) {
        let component = self.config.default_component(server_type);
        if component.repository.is_empty() {
            let default_repository = match server_type {
                ServerType::Cassandra => DEFAULT_CASSANDRA_REPOSITORY,
                ServerType::Dse => DEFAULT_DSE_REPOSITORY,
            };
            (default_repository, "")
        } else {
            (component.repository.as_str(), component.suffix.as_str())
        }
    }
}
