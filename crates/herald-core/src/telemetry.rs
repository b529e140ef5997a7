//! Error telemetry sink.
//!
//! Handler failures that are not mapped to a user-facing message are captured
//! through an [`ErrorReporter`]. The transport behind it (an error tracking
//! service, a log aggregator, ...) is outside the engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;

use crate::error::HandlerError;
use crate::event::EventKind;

/// Context captured alongside an unmapped handler failure.
#[derive(Debug)]
pub struct FailureReport {
    /// Kind of the event being dispatched.
    pub kind: EventKind,
    /// Name of the failing handler.
    pub handler: String,
    /// The failure itself.
    pub error: HandlerError,
    /// Serialised summary of the original event arguments.
    pub event: Value,
}

/// Receives unmapped handler failures for offline inspection.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Captures a failure.
    async fn capture(&self, report: &FailureReport);
}

/// A shared reporter handle.
pub type BoxedReporter = Arc<dyn ErrorReporter>;

/// Reporter that writes failures to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn capture(&self, report: &FailureReport) {
        error!(
            event_kind = %report.kind,
            handler = %report.handler,
            params = ?report.error.params(),
            event = %report.event,
            "Handler failed: {}",
            report.error
        );
    }
}
