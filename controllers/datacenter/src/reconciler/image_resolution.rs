//! Image resolution step.

use super::result::{ReconcileResult, ReconcileStep};
use super::ReconcileContext;
use async_trait::async_trait;
use resource_store::EventKind;
use tracing::{debug, warn};

/// Event reason recorded when the datacenter asks for an unusable server version.
pub const INVALID_SPEC_REASON: &str = "InvalidDatacenterSpec";

/// Resolves the server image for the datacenter.
///
/// An unsupported server version ends the pass with an error and a `Warning`
/// event on the datacenter.
pub struct ResolveImages;

#[async_trait]
impl ReconcileStep for ResolveImages {
    fn name(&self) -> &'static str {
        "resolve_images"
    }

    async fn run(&self, ctx: &ReconcileContext<'_>) -> ReconcileResult {
        match ctx.images.resolve_for_datacenter(ctx.dc) {
            Ok(image) => debug!("Server image for {}: {}", ctx.key(), image),
            Err(e) => {
                warn!("Cannot resolve server image for {}: {}", ctx.key(), e);
                ctx.events
                    .record(&ctx.object_ref, EventKind::Warning, INVALID_SPEC_REASON, &e.to_string())
                    .await;
                return ReconcileResult::Error(e.into());
            }
        }

        ReconcileResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::test_utils::{TestHarness, create_test_datacenter, create_test_dse_datacenter};
    use images::ImageError;
    use resource_store::RecordedEvent;

    #[tokio::test]
    async fn test_supported_version_continues() {
        let harness = TestHarness::new();
        let dc = create_test_dse_datacenter("dc1", "cass", "6.8.5");
        let ctx = harness.context(&dc);

        assert!(ResolveImages.run(&ctx).await.is_continue());
        assert!(harness.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_version_errors_with_warning_event() {
        let harness = TestHarness::new();
        let dc = create_test_dse_datacenter("dc1", "cass", "6.9.0");
        let ctx = harness.context(&dc);

        let result = ResolveImages.run(&ctx).await;

        assert!(matches!(
            result,
            ReconcileResult::Error(ControllerError::Image(ImageError::UnsupportedVersion { .. }))
        ));
        assert_eq!(
            harness.events.events(),
            vec![RecordedEvent {
                owner: Some("dc1".to_string()),
                kind: EventKind::Warning,
                reason: INVALID_SPEC_REASON.to_string(),
                message: "server 'dse' and version '6.9.0' do not work together".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_explicit_server_image_bypasses_version_check() {
        let harness = TestHarness::new();
        let mut dc = create_test_dse_datacenter("dc1", "cass", "6.9.0");
        dc.spec.server_image = Some("my.registry/dse:custom".to_string());
        let ctx = harness.context(&dc);

        assert!(ResolveImages.run(&ctx).await.is_continue());
    }

    #[tokio::test]
    async fn test_unconfigured_auxiliary_images_do_not_block() {
        let harness = TestHarness::with_images(images::ImageConfig {
            api_version: images::IMAGE_CONFIG_API_VERSION.to_string(),
            kind: images::IMAGE_CONFIG_KIND.to_string(),
            ..Default::default()
        });
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);

        assert!(ResolveImages.run(&ctx).await.is_continue());
    }
}
