//! Test doubles shared by the framework's unit tests.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use herald_core::{
    ApiResult, Bot, BoxedEvent, Choice, ErrorReporter, Event, EventKind, FailureReport,
    HandlerError, HandlerResult, Interaction, InteractionEvent, Occurrence, Rejection, Scope,
};
use parking_lot::Mutex;
use serde_json::json;

use crate::context::HandlerContext;
use crate::handler::{Handler, HandlerRef, handler_fn};
use crate::registration::HandlerOptions;
use crate::registry::Descriptor;

/// Records every outbound platform call.
#[derive(Default)]
pub struct RecordingBot {
    pub rejections: Mutex<Vec<String>>,
    pub autocompletes: Mutex<Vec<Vec<Choice>>>,
}

impl RecordingBot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejections(&self) -> Vec<String> {
        self.rejections.lock().clone()
    }

    pub fn autocompletes(&self) -> Vec<Vec<Choice>> {
        self.autocompletes.lock().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> &str {
        "recording-bot"
    }

    async fn send_rejection(&self, _event: &BoxedEvent, rejection: &Rejection) -> ApiResult<()> {
        self.rejections.lock().push(rejection.render());
        Ok(())
    }

    async fn respond_autocomplete(
        &self,
        _event: &BoxedEvent,
        choices: Vec<Choice>,
    ) -> ApiResult<()> {
        self.autocompletes.lock().push(choices);
        Ok(())
    }
}

/// Records captured failures as `(handler, message)` pairs.
#[derive(Default)]
pub struct RecordingReporter {
    pub captured: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn captured(&self) -> Vec<(String, String)> {
        self.captured.lock().clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn capture(&self, report: &FailureReport) {
        self.captured
            .lock()
            .push((report.handler.clone(), report.error.message().to_string()));
    }
}

/// A raw event with fixed occurrences.
pub struct TestEvent {
    pub kind: EventKind,
    pub occurrences: Vec<Occurrence>,
}

impl TestEvent {
    pub fn new(kind: EventKind, occurrences: Vec<Occurrence>) -> BoxedEvent {
        BoxedEvent::new(Self { kind, occurrences })
    }
}

impl Event for TestEvent {
    fn kind(&self) -> EventKind {
        self.kind
    }

    fn occurrences(&self) -> Vec<Occurrence> {
        self.occurrences.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn describe(&self) -> serde_json::Value {
        json!({ "kind": self.kind, "occurrences": self.occurrences.len() })
    }
}

/// A raw interaction payload.
pub struct TestInteraction {
    pub interaction: Interaction,
    pub scope: Option<Scope>,
}

impl TestInteraction {
    pub fn new(interaction: Interaction, scope: Option<Scope>) -> Arc<Self> {
        Arc::new(Self { interaction, scope })
    }
}

impl Event for TestInteraction {
    fn kind(&self) -> EventKind {
        self.interaction.kind().unwrap_or(EventKind::SlashCommand)
    }

    fn occurrences(&self) -> Vec<Occurrence> {
        vec![self.interaction.occurrence(self.scope.clone())]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl InteractionEvent for TestInteraction {
    fn interaction(&self) -> Interaction {
        self.interaction.clone()
    }

    fn scope(&self) -> Option<Scope> {
        self.scope.clone()
    }
}

/// A handler type that does nothing.
#[derive(Default)]
pub struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    async fn handle(&self, _ctx: &HandlerContext) -> HandlerResult {
        Ok(())
    }
}

/// A shared handler counting its invocations.
pub fn counting_handler() -> (Arc<dyn Handler>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = handler_fn(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            HandlerResult::Ok(())
        }
    });
    (Arc::new(handler), calls)
}

/// A shared handler that always fails with `error`.
pub fn failing_handler(error: impl Fn() -> HandlerError + Send + Sync + 'static) -> Arc<dyn Handler> {
    let error = Arc::new(error);
    Arc::new(handler_fn(move |_ctx| {
        let error = Arc::clone(&error);
        async move { HandlerResult::Err(error()) }
    }))
}

/// Builds a standalone descriptor.
pub fn descriptor(options: HandlerOptions, handler: Arc<dyn Handler>) -> Arc<Descriptor> {
    Arc::new(
        options
            .into_descriptor(HandlerRef::singleton(handler))
            .expect("valid options"),
    )
}
