//! Datacenter progress indicator.

use super::result::{ReconcileResult, ReconcileStep};
use super::ReconcileContext;
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::ProgressState;
use tracing::{debug, info};

/// Patches the progress indicator unless it already has `progress`.
pub async fn update_progress(ctx: &ReconcileContext<'_>, progress: ProgressState) -> Result<(), ControllerError> {
    if ctx.progress() == progress {
        debug!("CassandraDatacenter {} already {:?}", ctx.key(), progress);
        return Ok(());
    }
    ctx.ensure_active()?;
    info!("Setting CassandraDatacenter {} progress to {:?}", ctx.key(), progress);
    ctx.store
        .patch_datacenter_progress(&ctx.namespace, &ctx.name, progress)
        .await?;
    ctx.set_progress(progress);
    Ok(())
}

/// Final step: records that the datacenter converged and ends the pass.
pub struct MarkReady;

#[async_trait]
impl ReconcileStep for MarkReady {
    fn name(&self) -> &'static str {
        "mark_ready"
    }

    async fn run(&self, ctx: &ReconcileContext<'_>) -> ReconcileResult {
        match update_progress(ctx, ProgressState::Ready).await {
            Ok(()) => ReconcileResult::Done,
            Err(e) => ReconcileResult::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestHarness, create_test_datacenter};
    use crds::CassandraDatacenterStatus;
    use resource_store::StoreCall;

    #[tokio::test]
    async fn test_mark_ready_patches_once() {
        let harness = TestHarness::new();
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);

        assert!(matches!(MarkReady.run(&ctx).await, ReconcileResult::Done));
        assert!(matches!(MarkReady.run(&ctx).await, ReconcileResult::Done));

        assert_eq!(
            harness.store.calls(),
            vec![StoreCall::PatchProgress {
                namespace: "cass".to_string(),
                name: "dc1".to_string(),
                progress: ProgressState::Ready,
            }]
        );
    }

    #[tokio::test]
    async fn test_already_ready_is_not_patched() {
        let harness = TestHarness::new();
        let mut dc = create_test_datacenter("dc1", "cass");
        dc.status = Some(CassandraDatacenterStatus {
            cassandra_operator_progress: ProgressState::Ready,
        });
        let ctx = harness.context(&dc);

        assert!(matches!(MarkReady.run(&ctx).await, ReconcileResult::Done));
        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_updating_then_ready_within_one_pass() {
        let harness = TestHarness::new();
        let mut dc = create_test_datacenter("dc1", "cass");
        dc.status = Some(CassandraDatacenterStatus {
            cassandra_operator_progress: ProgressState::Ready,
        });
        let ctx = harness.context(&dc);

        update_progress(&ctx, ProgressState::Updating).await.expect("patch");
        assert!(matches!(MarkReady.run(&ctx).await, ReconcileResult::Done));

        assert_eq!(harness.store.progress("cass", "dc1"), Some(ProgressState::Ready));
        assert_eq!(harness.store.calls().len(), 2);
    }
}
