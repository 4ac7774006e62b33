//! Outcome of a reconcile step and the pipeline that threads it.
//!
//! Each step returns [`ReconcileResult::Continue`] to hand over to the next
//! step, [`ReconcileResult::Done`] to end the pass successfully, or
//! [`ReconcileResult::Error`] to abort the pass and let the scheduler retry.

use super::ReconcileContext;
use crate::error::ControllerError;
use async_trait::async_trait;
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::debug;

/// Outcome of one reconcile step.
#[derive(Debug)]
pub enum ReconcileResult {
    /// Proceed to the next step
    Continue,
    /// Stop the pass; everything converged
    Done,
    /// Abort the pass
    Error(ControllerError),
}

impl ReconcileResult {
    /// Whether the pipeline should run the next step.
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, ReconcileResult::Continue)
    }

    /// Converts the final outcome of a pass into a scheduler action.
    ///
    /// Successful passes requeue after `resync`; errors go to the error policy.
    pub fn into_action(self, resync: Duration) -> Result<Action, ControllerError> {
        match self {
            ReconcileResult::Continue | ReconcileResult::Done => Ok(Action::requeue(resync)),
            ReconcileResult::Error(e) => Err(e),
        }
    }
}

impl From<Result<(), ControllerError>> for ReconcileResult {
    fn from(result: Result<(), ControllerError>) -> Self {
        match result {
            Ok(()) => ReconcileResult::Continue,
            Err(e) => ReconcileResult::Error(e),
        }
    }
}

/// One independently runnable step of a reconcile pass.
#[async_trait]
pub trait ReconcileStep: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the step. Must be safe to re-run from scratch.
    async fn run(&self, ctx: &ReconcileContext<'_>) -> ReconcileResult;
}

/// Runs `steps` in order until one returns something other than `Continue`.
///
/// A cancelled pass stops before starting the next step.
pub async fn run_pipeline(steps: &[&dyn ReconcileStep], ctx: &ReconcileContext<'_>) -> ReconcileResult {
    for step in steps {
        if ctx.cancel.is_cancelled() {
            return ReconcileResult::Error(ControllerError::Cancelled);
        }
        debug!("Running step {} for {}", step.name(), ctx.key());
        let result = step.run(ctx).await;
        if !result.is_continue() {
            debug!("Step {} ended the pass for {}: {:?}", step.name(), ctx.key(), result);
            return result;
        }
    }
    ReconcileResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestHarness, create_test_datacenter};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        outcome: fn() -> ReconcileResult,
        runs: AtomicUsize,
    }

    impl Fixed {
        fn new(outcome: fn() -> ReconcileResult) -> Self {
            Self {
                outcome,
                runs: AtomicUsize::new(0),
            }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReconcileStep for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn run(&self, _ctx: &ReconcileContext<'_>) -> ReconcileResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    #[tokio::test]
    async fn test_continue_runs_every_step() {
        let harness = TestHarness::new();
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);
        let first = Fixed::new(|| ReconcileResult::Continue);
        let second = Fixed::new(|| ReconcileResult::Continue);

        let result = run_pipeline(&[&first, &second], &ctx).await;

        assert!(result.is_continue());
        assert_eq!((first.runs(), second.runs()), (1, 1));
    }

    #[tokio::test]
    async fn test_done_stops_pipeline() {
        let harness = TestHarness::new();
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);
        let first = Fixed::new(|| ReconcileResult::Done);
        let second = Fixed::new(|| ReconcileResult::Continue);

        let result = run_pipeline(&[&first, &second], &ctx).await;

        assert!(matches!(result, ReconcileResult::Done));
        assert_eq!(second.runs(), 0);
    }

    #[tokio::test]
    async fn test_error_aborts_pipeline() {
        let harness = TestHarness::new();
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);
        let first = Fixed::new(|| ReconcileResult::Error(ControllerError::InvalidConfig("boom".to_string())));
        let second = Fixed::new(|| ReconcileResult::Continue);

        let result = run_pipeline(&[&first, &second], &ctx).await;

        assert!(matches!(result, ReconcileResult::Error(ControllerError::InvalidConfig(_))));
        assert_eq!(second.runs(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_pass_runs_nothing() {
        let harness = TestHarness::new();
        let dc = create_test_datacenter("dc1", "cass");
        let ctx = harness.context(&dc);
        ctx.cancel.cancel();
        let first = Fixed::new(|| ReconcileResult::Continue);

        let result = run_pipeline(&[&first], &ctx).await;

        assert!(matches!(result, ReconcileResult::Error(ControllerError::Cancelled)));
        assert_eq!(first.runs(), 0);
    }

    #[test]
    fn test_into_action() {
        let resync = Duration::from_secs(300);
        assert_eq!(
            ReconcileResult::Done.into_action(resync).expect("done is success"),
            Action::requeue(resync)
        );
        assert_eq!(
            ReconcileResult::Continue.into_action(resync).expect("continue is success"),
            Action::requeue(resync)
        );
        assert!(matches!(
            ReconcileResult::Error(ControllerError::Cancelled).into_action(resync),
            Err(ControllerError::Cancelled)
        ));
    }

    #[test]
    fn test_from_result() {
        assert!(ReconcileResult::from(Ok(())).is_continue());
        assert!(matches!(
            ReconcileResult::from(Err(ControllerError::Cancelled)),
            ReconcileResult::Error(ControllerError::Cancelled)
        ));
    }
}
