//! Reloadable image configuration.
//!
//! Holds the current [`ImageConfig`] behind an `ArcSwap`: readers take a
//! lock-free snapshot, reloads build a complete new value and swap it in. A
//! reader never observes a half-updated configuration.

use crate::config::ImageConfig;
use crate::error::ConfigError;
use crate::resolver::ImageResolver;
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handle to the process-wide image configuration
#[derive(Debug, Clone)]
pub struct ReloadableImageConfig {
    inner: Arc<ArcSwap<ImageConfig>>,
}

impl ReloadableImageConfig {
    /// Wraps an already-loaded configuration.
    #[must_use]
    pub fn new(config: ImageConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Loads the initial configuration from `path`. Failure is fatal to the caller.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(ImageConfig::from_file(path)?))
    }

    /// Current configuration snapshot (single atomic load).
    #[must_use]
    pub fn current(&self) -> Arc<ImageConfig> {
        self.inner.load_full()
    }

    /// Resolver bound to the current snapshot; later reloads do not affect it.
    #[must_use]
    pub fn resolver(&self) -> ImageResolver {
        ImageResolver::new(self.current())
    }

    /// Replaces the configuration with `config`.
    pub fn replace(&self, config: ImageConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Re-reads `path` and swaps in the result.
    ///
    /// On failure the previous configuration stays in place and the error is
    /// returned.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        match ImageConfig::from_file(path) {
            Ok(config) => {
                self.replace(config);
                info!("Reloaded image config from {}", path.display());
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous image config, reload from {} failed: {}", path.display(), e);
                Err(e)
            }
        }
    }
}
