//! Event dispatcher for Herald.
//!
//! The [`Dispatcher`] owns the [`Registry`] and runs one dispatch per raw
//! event:
//!
//! 1. The event's occurrences are resolved against the registry and every
//!    candidate is filtered, in occurrence order then discovery order
//! 2. Accepted handlers run one at a time in that order; a handler reached
//!    through several occurrences or paths runs once
//! 3. A failing handler either gets its mapped message sent to the user or is
//!    logged and captured by the [`ErrorReporter`](herald_core::ErrorReporter)
//! 4. After every accepted handler completed, each rejection of a handler
//!    that did not run and configured a message for its reason notifies the
//!    user; all other rejections are dropped silently
//!
//! No failure inside a dispatch escapes it.
//!
//! # Tower Service Integration
//!
//! `Dispatcher` implements `tower::Service<BoxedEvent>`, so middleware can be
//! layered in front of it:
//!
//! ```rust,ignore
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(64)
//!     .service(dispatcher.clone());
//! ```

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use herald_core::{
    BoxedBot, BoxedEvent, BoxedReporter, EventKind, FailureReport, HandlerError, HandlerResult,
    Occurrence, Rejection, TracingReporter,
};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::command::CommandIds;
use crate::context::HandlerContext;
use crate::error::RegistryResult;
use crate::filter::{self, FilterResult, Verdict};
use crate::handler::HandlerId;
use crate::registry::{Descriptor, Registry};

/// Default number of autocomplete suggestions sent to the platform.
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 25;

/// Tunables for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Treat a panicking handler as a failed one instead of unwinding.
    pub catch_panics: bool,
    /// Maximum autocomplete suggestions forwarded to the platform.
    pub autocomplete_limit: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            catch_panics: true,
            autocomplete_limit: DEFAULT_AUTOCOMPLETE_LIMIT,
        }
    }
}

/// Summary of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Occurrences derived from the event.
    pub occurrences: usize,
    /// Filter results across all occurrences.
    pub candidates: usize,
    /// Handlers invoked.
    pub executed: usize,
    /// Invoked handlers that returned an error or panicked.
    pub failed: usize,
    /// Rejection messages delivered to the user.
    pub replies: usize,
    /// Rejections dropped without a message.
    pub suppressed: usize,
}

/// The central event dispatcher.
///
/// Cloning is cheap and every clone shares the same registry and command id
/// table.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<RwLock<Registry>>,
    command_ids: Arc<CommandIds>,
    bot: BoxedBot,
    reporter: BoxedReporter,
    settings: DispatchSettings,
}

impl Dispatcher {
    /// Creates a dispatcher that reports failures to the `tracing` log.
    pub fn new(registry: Registry, bot: BoxedBot) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            command_ids: Arc::new(CommandIds::new()),
            bot,
            reporter: Arc::new(TracingReporter),
            settings: DispatchSettings::default(),
        }
    }

    /// Replaces the failure reporter.
    pub fn with_reporter(mut self, reporter: BoxedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Read access to the registry.
    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read()
    }

    pub fn command_ids(&self) -> &CommandIds {
        &self.command_ids
    }

    /// Returns the platform id of a synchronised command.
    pub fn command_id(&self, name: &str) -> Option<String> {
        self.command_ids.get(name)
    }

    /// Installs the ids assigned by remote command registration and rekeys
    /// the command subtrees accordingly.
    pub fn apply_command_ids(&self, ids: HashMap<String, String>) -> RegistryResult<()> {
        self.registry.write().rekey_commands(&ids)?;
        debug!(commands = ids.len(), "Applied command ids");
        self.command_ids.replace(ids);
        Ok(())
    }

    /// Resolves and filters the candidates of every occurrence.
    pub fn evaluate(&self, kind: EventKind, occurrences: &[Occurrence]) -> Vec<FilterResult> {
        let registry = self.registry.read();
        occurrences
            .iter()
            .enumerate()
            .flat_map(|(index, occurrence)| {
                let candidates = registry.lookup(kind, &occurrence.key_path);
                filter::run(candidates, occurrence, index)
            })
            .collect()
    }

    /// Dispatches a raw event using the occurrences it derives itself.
    pub async fn dispatch(&self, event: BoxedEvent) -> DispatchReport {
        let kind = event.kind();
        let occurrences = event.occurrences();
        self.dispatch_occurrences(kind, event, occurrences).await
    }

    /// Dispatches a raw event as `kind` with explicit occurrences.
    pub async fn dispatch_occurrences(
        &self,
        kind: EventKind,
        event: BoxedEvent,
        occurrences: Vec<Occurrence>,
    ) -> DispatchReport {
        let span = debug_span!("dispatch", event_kind = %kind);
        self.run_dispatch(kind, event, occurrences)
            .instrument(span)
            .await
    }

    async fn run_dispatch(
        &self,
        kind: EventKind,
        event: BoxedEvent,
        occurrences: Vec<Occurrence>,
    ) -> DispatchReport {
        let results = self.evaluate(kind, &occurrences);
        let mut report = DispatchReport {
            occurrences: occurrences.len(),
            candidates: results.len(),
            ..DispatchReport::default()
        };

        let (accepted, rejected): (Vec<_>, Vec<_>) = results
            .into_iter()
            .partition(|result| result.verdict.is_accepted());

        let ctx = HandlerContext::new(kind, event.clone(), Arc::clone(&self.bot));
        let mut executed: HashSet<HandlerId> = HashSet::new();

        for result in accepted {
            let descriptor = result.descriptor;
            if !executed.insert(descriptor.handler().id()) {
                trace!(handler = descriptor.name(), "Handler already ran for this event");
                continue;
            }
            report.executed += 1;

            let Err(error) = self.invoke(&descriptor, &ctx).await else {
                continue;
            };
            report.failed += 1;

            match descriptor.messages().for_error(&error) {
                Some(text) => {
                    let rejection = Rejection::with_params(text, error.params().clone());
                    if self.reply(&event, &descriptor, &rejection).await {
                        report.replies += 1;
                    }
                }
                None => {
                    warn!(handler = descriptor.name(), error = %error, "Handler failed");
                    let failure = FailureReport {
                        kind,
                        handler: descriptor.name().to_string(),
                        error,
                        event: event.describe(),
                    };
                    self.reporter.capture(&failure).await;
                }
            }
        }

        for result in rejected {
            let Verdict::Rejected(reason) = result.verdict else {
                continue;
            };
            let descriptor = result.descriptor;

            let text = if executed.contains(&descriptor.handler().id()) {
                None
            } else {
                descriptor.messages().for_reason(reason)
            };
            match text {
                Some(text) => {
                    if self.reply(&event, &descriptor, &Rejection::new(text)).await {
                        report.replies += 1;
                    }
                }
                None => {
                    trace!(handler = descriptor.name(), %reason, "Rejection suppressed");
                    report.suppressed += 1;
                }
            }
        }

        debug!(
            occurrences = report.occurrences,
            candidates = report.candidates,
            executed = report.executed,
            failed = report.failed,
            replies = report.replies,
            "Dispatch complete"
        );
        report
    }

    async fn invoke(&self, descriptor: &Descriptor, ctx: &HandlerContext) -> HandlerResult {
        trace!(handler = descriptor.name(), "Invoking handler");

        // Factory construction runs inside the guard too.
        let run = async { descriptor.handler().resolve().handle(ctx).await };
        if !self.settings.catch_panics {
            return run.await;
        }
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(HandlerError::panicked(payload)),
        }
    }

    async fn reply(&self, event: &BoxedEvent, descriptor: &Descriptor, rejection: &Rejection) -> bool {
        match self.bot.send_rejection(event, rejection).await {
            Ok(()) => true,
            Err(err) => {
                warn!(handler = descriptor.name(), error = %err, "Failed to send rejection");
                false
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bot", &self.bot.id())
            .field("handlers", &self.registry.read().descriptors().len())
            .field("settings", &self.settings)
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

impl Service<BoxedEvent> for Dispatcher {
    type Response = DispatchReport;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: BoxedEvent) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(event).await) })
    }
}
