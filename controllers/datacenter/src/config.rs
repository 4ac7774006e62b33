//! Process configuration read from environment variables.
//!
//! - `WATCH_NAMESPACE`: namespace to watch (unset or empty = all namespaces)
//! - `IMAGE_CONFIG_PATH`: image config document (default `/configs/image_config.yaml`)
//! - `RESYNC_INTERVAL_SECS`: delay before a converged datacenter is checked again (default 300)

use crate::error::ControllerError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_IMAGE_CONFIG_PATH: &str = "/configs/image_config.yaml";
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub namespace: Option<String>,
    pub image_config_path: PathBuf,
    pub resync_interval: Duration,
}

impl OperatorConfig {
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        let image_config_path = lookup("IMAGE_CONFIG_PATH")
            .filter(|p| !p.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_IMAGE_CONFIG_PATH), PathBuf::from);

        let resync_secs = match lookup("RESYNC_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ControllerError::InvalidConfig(format!("RESYNC_INTERVAL_SECS '{raw}' is not a number: {e}"))
            })?,
            None => DEFAULT_RESYNC_INTERVAL_SECS,
        };
        if resync_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RESYNC_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            namespace,
            image_config_path,
            resync_interval: Duration::from_secs(resync_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<OperatorConfig, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        OperatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_vars(&[]).expect("defaults are valid");
        assert_eq!(config.namespace, None);
        assert_eq!(config.image_config_path, PathBuf::from("/configs/image_config.yaml"));
        assert_eq!(config.resync_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let config = from_vars(&[
            ("WATCH_NAMESPACE", "cass"),
            ("IMAGE_CONFIG_PATH", "/tmp/images.yaml"),
            ("RESYNC_INTERVAL_SECS", "60"),
        ])
        .expect("valid");
        assert_eq!(config.namespace.as_deref(), Some("cass"));
        assert_eq!(config.image_config_path, PathBuf::from("/tmp/images.yaml"));
        assert_eq!(config.resync_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_namespace_means_all() {
        let config = from_vars(&[("WATCH_NAMESPACE", "")]).expect("valid");
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_invalid_resync_interval() {
        assert!(matches!(
            from_vars(&[("RESYNC_INTERVAL_SECS", "soon")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            from_vars(&[("RESYNC_INTERVAL_SECS", "0")]),
            Err(ControllerError::InvalidConfig(_))
        ));
    }
}
