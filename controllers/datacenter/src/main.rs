//! Datacenter Controller
//!
//! Converges the Services of every CassandraDatacenter and validates its
//! server image:
//! - builds the desired Service topology from the datacenter spec
//! - creates missing Services and updates drifted ones, preserving
//!   platform-allocated fields
//! - resolves server and auxiliary images against the image configuration

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Datacenter Controller");

    let config = OperatorConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Image config: {}", config.image_config_path.display());
    info!("  Resync interval: {}s", config.resync_interval.as_secs());

    let controller = Controller::new(config).await?;
    controller.run().await
}
