//! Runtime orchestration.
//!
//! Startup runs in a fixed order and every failure aborts it:
//!
//! 1. Load and validate configuration
//! 2. Initialise logging
//! 3. Register each [`HandlerModule`] in the order given
//! 4. Submit command definitions through [`CommandSync`] and rekey the
//!    command handlers by the returned platform ids
//!
//! Only then does the runtime accept events. Each delivered event is
//! dispatched on its own task, so dispatches may overlap while the handlers
//! of one dispatch still run one after another.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! let runtime = HeraldRuntime::builder()
//!     .bot(bot)
//!     .module(greetings)
//!     .module(moderation)
//!     .command_sync(platform_commands)
//!     .start()
//!     .await?;
//!
//! // From the platform event loop:
//! runtime.deliver(BoxedEvent::new(message));
//!
//! runtime.run().await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use herald_core::{BoxedBot, BoxedEvent, BoxedReporter, Event, InteractionEvent};
use herald_framework::{DispatchReport, Dispatcher, Registry, RegistryStats, RouteOutcome};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, HeraldConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::module::{BoxedModule, CommandSync, HandlerModule};

/// A started Herald runtime.
///
/// Built with [`HeraldRuntime::builder`]; see the module docs for the
/// startup sequence.
pub struct HeraldRuntime {
    config: HeraldConfig,
    dispatcher: Dispatcher,
    tracker: TaskTracker,
    shutdown_token: CancellationToken,
}

impl HeraldRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the platform id of a synchronised command.
    pub fn command_id(&self, name: &str) -> Option<String> {
        self.dispatcher.command_id(name)
    }

    /// Renders the clickable mention of a synchronised command.
    pub fn mention(&self, name: &str) -> Option<String> {
        self.dispatcher.command_ids().mention(name)
    }

    pub fn stats(&self) -> RegistryStats {
        self.dispatcher.registry().stats()
    }

    // =========================================================================
    // Event Delivery
    // =========================================================================

    /// Dispatches a raw event on a new task.
    ///
    /// Returns `None` once shutdown has begun; the event is dropped.
    pub fn deliver(&self, event: BoxedEvent) -> Option<JoinHandle<DispatchReport>> {
        if self.tracker.is_closed() {
            warn!(event_kind = %event.kind(), "Runtime is shutting down, dropping event");
            return None;
        }

        let dispatcher = self.dispatcher.clone();
        Some(
            self.tracker
                .spawn(async move { dispatcher.dispatch(event).await }),
        )
    }

    /// Routes a platform interaction on a new task.
    ///
    /// Returns `None` once shutdown has begun; the interaction is dropped.
    pub fn deliver_interaction<E: InteractionEvent>(
        &self,
        event: Arc<E>,
    ) -> Option<JoinHandle<RouteOutcome>> {
        if self.tracker.is_closed() {
            warn!(event_kind = %event.kind(), "Runtime is shutting down, dropping interaction");
            return None;
        }

        let dispatcher = self.dispatcher.clone();
        Some(
            self.tracker
                .spawn(async move { dispatcher.route_interaction(event).await }),
        )
    }

    /// Number of dispatches still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Token that makes [`run`](Self::run) return when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Stops accepting events and waits for in-flight dispatches.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(
            in_flight = self.tracker.len(),
            "Shutting down, waiting for in-flight dispatches"
        );
        self.tracker.wait().await;
        info!("Herald runtime stopped");
    }

    /// Serves until Ctrl+C, SIGTERM or the shutdown token, then shuts down.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Herald runtime is now running. Press Ctrl+C to stop.");
        self.wait_for_shutdown().await?;
        self.shutdown().await;
        Ok(())
    }

    async fn wait_for_shutdown(&self) -> RuntimeResult<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

            tokio::select! {
                result = signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl+C, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
                () = self.shutdown_token.cancelled() => {
                    debug!("Shutdown requested");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                result = signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl+C, shutting down");
                }
                () = self.shutdown_token.cancelled() => {
                    debug!("Shutdown requested");
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for HeraldRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeraldRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("in_flight", &self.tracker.len())
            .field("closed", &self.tracker.is_closed())
            .finish()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder collecting everything startup needs.
///
/// ```rust,ignore
/// let runtime = HeraldRuntime::builder()
///     .config_file("config/herald.toml")
///     .profile("production")
///     .bot(bot)
///     .module(tickets)
///     .start()
///     .await?;
/// ```
pub struct RuntimeBuilder {
    config: Option<HeraldConfig>,
    loader: ConfigLoader,
    modules: Vec<BoxedModule>,
    bot: Option<BoxedBot>,
    reporter: Option<BoxedReporter>,
    command_sync: Option<Arc<dyn CommandSync>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            loader: ConfigLoader::new(),
            modules: Vec::new(),
            bot: None,
            reporter: None,
            command_sync: None,
            init_logging: true,
        }
    }

    /// Uses this configuration instead of loading one.
    pub fn config(mut self, config: HeraldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    /// Ignores `HERALD_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Appends a module. Modules register in the order they are added.
    pub fn module(mut self, module: impl HandlerModule + 'static) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    pub fn modules<I>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = BoxedModule>,
    {
        self.modules.extend(modules);
        self
    }

    pub fn bot(mut self, bot: BoxedBot) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Replaces the default `tracing` failure reporter.
    pub fn reporter(mut self, reporter: BoxedReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn command_sync(mut self, sync: impl CommandSync + 'static) -> Self {
        self.command_sync = Some(Arc::new(sync));
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Runs the startup sequence.
    pub async fn start(self) -> RuntimeResult<HeraldRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.loader.load()?,
        };
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let bot = self.bot.ok_or(RuntimeError::MissingBot)?;

        let mut registry = Registry::new();
        for module in &self.modules {
            module.register(&mut registry).map_err(|source| {
                error!(module = module.name(), error = %source, "Module registration failed");
                RuntimeError::Module {
                    module: module.name().to_string(),
                    source,
                }
            })?;
            debug!(module = module.name(), "Module registered");
        }

        let mut dispatcher =
            Dispatcher::new(registry, bot).with_settings(config.dispatch.settings());
        if let Some(reporter) = self.reporter {
            dispatcher = dispatcher.with_reporter(reporter);
        }

        match (&self.command_sync, config.dispatch.sync_commands) {
            (Some(sync), true) => sync_commands(&dispatcher, sync.as_ref()).await?,
            (None, true) => debug!("No command sync configured, commands stay keyed by name"),
            (_, false) => info!("Command synchronisation disabled"),
        }

        let stats = dispatcher.registry().stats();
        info!(
            modules = self.modules.len(),
            handlers = stats.handlers,
            per_kind = ?stats.per_kind,
            commands = dispatcher.command_ids().len(),
            "Herald runtime started"
        );

        Ok(HeraldRuntime {
            config,
            dispatcher,
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        })
    }
}

/// Submits every command definition and rekeys the command subtrees.
async fn sync_commands(dispatcher: &Dispatcher, sync: &dyn CommandSync) -> RuntimeResult<()> {
    let definitions = dispatcher.registry().command_definitions();
    debug!(commands = definitions.len(), "Synchronising commands");

    let ids = sync.sync(&definitions).await.map_err(|e| {
        error!(error = %e, "Command synchronisation failed");
        RuntimeError::CommandSync(e)
    })?;
    info!(
        submitted = definitions.len(),
        assigned = ids.len(),
        "Commands synchronised"
    );

    dispatcher.apply_command_ids(ids).map_err(|e| {
        error!(error = %e, "Failed to rekey command handlers");
        RuntimeError::Rekey(e)
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use herald_core::{
        ApiResult, Bot, BoxError, Choice, CommandInvocation, EventKind, HandlerResult,
        Interaction, Occurrence, Rejection, Scope,
    };
    use herald_framework::{
        CommandDefinition, CommandSpec, HandlerContext, HandlerOptions, RegistryError, handler_fn,
    };
    use parking_lot::Mutex;

    use crate::module::module;

    #[derive(Default)]
    struct StubBot {
        rejections: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Bot for StubBot {
        fn id(&self) -> &str {
            "stub"
        }

        async fn send_rejection(&self, _event: &BoxedEvent, rejection: &Rejection) -> ApiResult<()> {
            self.rejections.lock().push(rejection.render());
            Ok(())
        }

        async fn respond_autocomplete(
            &self,
            _event: &BoxedEvent,
            _choices: Vec<Choice>,
        ) -> ApiResult<()> {
            Ok(())
        }
    }

    struct Message {
        channel: String,
    }

    impl Event for Message {
        fn kind(&self) -> EventKind {
            EventKind::Message
        }

        fn occurrences(&self) -> Vec<Occurrence> {
            vec![Occurrence::scoped(
                self.channel.as_str(),
                Scope::server().content("hello"),
            )]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct SlashInteraction {
        invocation: CommandInvocation,
    }

    impl Event for SlashInteraction {
        fn kind(&self) -> EventKind {
            EventKind::SlashCommand
        }

        fn occurrences(&self) -> Vec<Occurrence> {
            vec![self.interaction().occurrence(self.scope())]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl InteractionEvent for SlashInteraction {
        fn interaction(&self) -> Interaction {
            Interaction::SlashCommand(self.invocation.clone())
        }

        fn scope(&self) -> Option<Scope> {
            Some(Scope::server())
        }
    }

    /// Assigns `id-{name}` to every submitted command.
    #[derive(Default)]
    struct StubSync {
        submitted: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CommandSync for StubSync {
        async fn sync(
            &self,
            definitions: &[CommandDefinition],
        ) -> Result<HashMap<String, String>, BoxError> {
            let mut submitted = self.submitted.lock();
            Ok(definitions
                .iter()
                .map(|definition| {
                    submitted.push(definition.name.clone());
                    (definition.name.clone(), format!("id-{}", definition.name))
                })
                .collect())
        }
    }

    struct FailingSync;

    #[async_trait]
    impl CommandSync for FailingSync {
        async fn sync(
            &self,
            _definitions: &[CommandDefinition],
        ) -> Result<HashMap<String, String>, BoxError> {
            Err("platform unavailable".into())
        }
    }

    fn counter() -> (Arc<dyn herald_framework::Handler>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move |_ctx: HandlerContext| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                HandlerResult::Ok(())
            }
        });
        (Arc::new(handler), calls)
    }

    fn builder() -> RuntimeBuilder {
        HeraldRuntime::builder()
            .config(HeraldConfig::default())
            .without_logging()
            .bot(Arc::new(StubBot::default()))
    }

    #[tokio::test]
    async fn test_start_syncs_and_rekeys_commands() {
        let (ping, ping_calls) = counter();
        let (greet, greet_calls) = counter();
        let submitted = Arc::new(Mutex::new(Vec::new()));

        let runtime = builder()
            .module(module("ping", move |registry| {
                registry.register_instance(
                    HandlerOptions::slash(CommandSpec::new("ping", "Replies with pong")),
                    Arc::clone(&ping),
                )?;
                Ok(())
            }))
            .module(module("greetings", move |registry| {
                registry.register_instance(
                    HandlerOptions::message().channel("welcome"),
                    Arc::clone(&greet),
                )?;
                Ok(())
            }))
            .command_sync(StubSync {
                submitted: Arc::clone(&submitted),
            })
            .start()
            .await
            .unwrap();

        assert_eq!(*submitted.lock(), ["ping"]);
        assert_eq!(runtime.command_id("ping").as_deref(), Some("id-ping"));
        assert_eq!(runtime.mention("ping").as_deref(), Some("</ping:id-ping>"));
        assert_eq!(runtime.stats().handlers, 2);

        let outcome = runtime
            .deliver_interaction(Arc::new(SlashInteraction {
                invocation: CommandInvocation::new("id-ping"),
            }))
            .unwrap()
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Dispatched(ref report) if report.executed == 1));

        let report = runtime
            .deliver(BoxedEvent::new(Message {
                channel: "welcome".into(),
            }))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(report.executed, 1);

        runtime.shutdown().await;
        assert_eq!(ping_calls.load(Ordering::SeqCst), 1);
        assert_eq!(greet_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_command_routes_by_name_without_sync() {
        let (ping, calls) = counter();
        let mut config = HeraldConfig::default();
        config.dispatch.sync_commands = false;

        let runtime = builder()
            .config(config)
            .module(module("ping", move |registry| {
                registry.register_instance(
                    HandlerOptions::slash(CommandSpec::new("ping", "Replies with pong")),
                    Arc::clone(&ping),
                )?;
                Ok(())
            }))
            .command_sync(FailingSync)
            .start()
            .await
            .unwrap();

        assert_eq!(runtime.command_id("ping"), None);
        runtime
            .deliver_interaction(Arc::new(SlashInteraction {
                invocation: CommandInvocation::new("ping"),
            }))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_module_failure_aborts_startup() {
        let result = builder()
            .module(module("broken", |registry| {
                registry.register_instance(
                    HandlerOptions::message().pattern("(unclosed"),
                    counter().0,
                )?;
                Ok(())
            }))
            .start()
            .await;

        assert!(matches!(
            result,
            Err(RuntimeError::Module {
                module: ref name,
                source: RegistryError::InvalidPattern { .. },
            }) if name == "broken"
        ));
    }

    #[tokio::test]
    async fn test_sync_failure_aborts_startup() {
        let result = builder().command_sync(FailingSync).start().await;
        assert!(matches!(result, Err(RuntimeError::CommandSync(_))));
    }

    #[tokio::test]
    async fn test_missing_bot() {
        let result = HeraldRuntime::builder()
            .config(HeraldConfig::default())
            .without_logging()
            .start()
            .await;
        assert!(matches!(result, Err(RuntimeError::MissingBot)));
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_startup() {
        let mut config = HeraldConfig::default();
        config.dispatch.autocomplete_limit = 0;
        let result = builder().config(config).start().await;
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_dispatches() {
        let finished = Arc::new(AtomicUsize::new(0));
        let done = Arc::clone(&finished);
        let slow = Arc::new(handler_fn(move |_ctx: HandlerContext| {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
                HandlerResult::Ok(())
            }
        }));

        let runtime = builder()
            .module(module("slow", move |registry| {
                registry.register_instance(HandlerOptions::message(), slow.clone())?;
                Ok(())
            }))
            .start()
            .await
            .unwrap();

        for _ in 0..3 {
            runtime.deliver(BoxedEvent::new(Message {
                channel: "general".into(),
            }));
        }
        runtime.shutdown().await;

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(runtime.in_flight(), 0);
        assert!(
            runtime
                .deliver(BoxedEvent::new(Message {
                    channel: "general".into(),
                }))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_run_returns_when_token_cancelled() {
        let runtime = builder().start().await.unwrap();
        runtime.shutdown_token().cancel();
        runtime.run().await.unwrap();
        assert!(runtime.deliver(BoxedEvent::new(Message { channel: "x".into() })).is_none());
    }
}
