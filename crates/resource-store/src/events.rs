//! Operational events attached to the owning datacenter.
//!
//! Recording is best effort: a failed publish is logged and swallowed so it can
//! never fail a reconcile pass.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

/// Severity of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Routine change, e.g. a created resource
    Normal,

    /// Something the user should look at
    Warning,
}

/// Sink for events about a datacenter.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Record an event against `owner`. Never fails.
    async fn record(&self, owner: &ObjectReference, kind: EventKind, reason: &str, message: &str);
}

/// [`EventSink`] publishing `events.k8s.io` events through a kube-runtime [`Recorder`].
#[derive(Clone)]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSink").finish_non_exhaustive()
    }
}

impl KubeEventSink {
    /// Creates a sink reporting as `controller_name`.
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait::async_trait]
impl EventSink for KubeEventSink {
    async fn record(&self, owner: &ObjectReference, kind: EventKind, reason: &str, message: &str) {
        let event = Event {
            type_: match kind {
                EventKind::Normal => EventType::Normal,
                EventKind::Warning => EventType::Warning,
            },
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: "Reconcile".to_string(),
            secondary: None,
        };

        if let Err(e) = self.recorder.publish(&event, owner).await {
            warn!(
                "Failed to record {} event for {}/{}: {}",
                reason,
                owner.namespace.as_deref().unwrap_or_default(),
                owner.name.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}
