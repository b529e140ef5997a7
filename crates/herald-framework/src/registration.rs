//! Registration API.
//!
//! Feature modules describe each handler with [`HandlerOptions`] and insert it
//! into a [`Registry`] at startup:
//!
//! ```rust,ignore
//! registry.register::<BanCommand>(
//!     HandlerOptions::slash(CommandSpec::new("mod", "Moderation").subcommand("ban"))
//!         .location(Location::Server)
//!         .roles(["moderator"])
//!         .reject_message(RejectReason::MissingRole, "Only moderators can ban.")
//!         .error_message("user not found", "I couldn't find {user}."),
//! )?;
//!
//! registry.register_instance(
//!     HandlerOptions::message().channel("suggestions"),
//!     Arc::new(handler_fn(collect_suggestion)),
//! )?;
//! ```
//!
//! Registering twice for the same path adds two independent handlers.

use std::collections::HashMap;
use std::sync::Arc;

use herald_core::{EventKind, HandlerError, KeyPath};
use regex::Regex;
use tracing::debug;

use crate::command::CommandSpec;
use crate::error::{RegistryError, RegistryResult};
use crate::filter::{Location, RejectReason};
use crate::handler::{Handler, HandlerRef};
use crate::registry::{Descriptor, Registry};

// ============================================================================
// ErrorMessages
// ============================================================================

/// User-facing texts a handler opts into.
///
/// Keys are either a [`RejectReason::key`] or the exact message text of a
/// [`HandlerError`] the handler may return. Values may contain `{param}`
/// placeholders filled from the error's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessages {
    messages: HashMap<String, String>,
}

impl ErrorMessages {
    /// Adds or replaces a message.
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.messages.insert(key.into(), text.into());
    }

    /// Message configured for a filter rejection.
    pub fn for_reason(&self, reason: RejectReason) -> Option<&str> {
        self.messages.get(reason.key()).map(String::as_str)
    }

    /// Message configured for a handler failure, matched on its exact text.
    pub fn for_error(&self, error: &HandlerError) -> Option<&str> {
        self.messages.get(error.message()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ============================================================================
// HandlerOptions
// ============================================================================

/// Registration options for one handler.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    kind: EventKind,
    paths: Vec<KeyPath>,
    command: Option<CommandSpec>,
    location: Location,
    roles: Vec<String>,
    pattern: Option<String>,
    messages: ErrorMessages,
    stateful: bool,
    name: Option<String>,
}

impl HandlerOptions {
    /// Options for an arbitrary event kind.
    ///
    /// Without an explicit [`path`](Self::path) the handler is registered on
    /// the wildcard and receives every occurrence of its kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            paths: Vec::new(),
            command: None,
            location: Location::default(),
            roles: Vec::new(),
            pattern: None,
            messages: ErrorMessages::default(),
            stateful: false,
            name: None,
        }
    }

    /// A message handler.
    pub fn message() -> Self {
        Self::new(EventKind::Message)
    }

    /// A button handler keyed by the button's custom id.
    pub fn button(custom_id: impl Into<String>) -> Self {
        Self::new(EventKind::Button).path(KeyPath::new([custom_id.into()]))
    }

    /// A slash command handler.
    pub fn slash(spec: CommandSpec) -> Self {
        Self::new(EventKind::SlashCommand).command(spec)
    }

    /// A message context-menu handler.
    pub fn message_menu(spec: CommandSpec) -> Self {
        Self::new(EventKind::MessageContextMenu).command(spec)
    }

    /// A user context-menu handler.
    pub fn user_menu(spec: CommandSpec) -> Self {
        Self::new(EventKind::UserContextMenu).command(spec)
    }

    /// Sets the command definition.
    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.command = Some(spec);
        self
    }

    /// Adds a key path. May be called several times.
    pub fn path(mut self, path: impl Into<KeyPath>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Restricts the handler to a channel by name.
    pub fn channel(self, name: impl Into<String>) -> Self {
        self.path(KeyPath::new([name.into()]))
    }

    /// Restricts the handler to any of the named channels.
    pub fn channels<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |options, name| options.channel(name))
    }

    pub fn location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Sets the allowed role names. An empty list allows everyone.
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the content pattern. Compiled when the handler is registered.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Configures the reply sent when the handler is filtered out for `reason`.
    pub fn reject_message(mut self, reason: RejectReason, text: impl Into<String>) -> Self {
        self.messages.insert(reason.key(), text);
        self
    }

    /// Configures the reply sent when the handler fails with `error` text.
    pub fn error_message(mut self, error: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(error, text);
        self
    }

    /// Keeps one shared instance instead of constructing one per dispatch.
    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    /// Overrides the name shown in logs and failure reports.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Validates the options and builds a descriptor for `handler`.
    pub(crate) fn into_descriptor(self, handler: HandlerRef) -> RegistryResult<Descriptor> {
        let kind = self.kind;
        let command = match (kind.is_command(), self.command) {
            (true, Some(spec)) => Some(Arc::new(spec)),
            (true, None) => return Err(RegistryError::MissingCommand { kind }),
            (false, Some(_)) => return Err(RegistryError::UnexpectedCommand { kind }),
            (false, None) => None,
        };

        let pattern = self
            .pattern
            .map(|pattern| {
                Regex::new(&pattern)
                    .map_err(|source| RegistryError::InvalidPattern { pattern, source })
            })
            .transpose()?;

        let paths = match &command {
            Some(spec) => vec![command_path(kind, spec, &spec.name)],
            None if self.paths.is_empty() => vec![KeyPath::new([KeyPath::WILDCARD])],
            None => self.paths,
        };

        let name = self.name.unwrap_or_else(|| handler.name().to_string());

        Ok(Descriptor::new(
            kind,
            name,
            handler,
            self.location,
            self.roles,
            pattern,
            self.messages,
            command,
            paths,
        ))
    }
}

/// Key path of a command handler with `head` as the first segment.
///
/// Slash commands route on `[command, group, subcommand]`; context menus on
/// the command alone.
pub(crate) fn command_path(kind: EventKind, spec: &CommandSpec, head: &str) -> KeyPath {
    match kind {
        EventKind::SlashCommand => {
            let [group, subcommand] = spec.route();
            KeyPath::new([head, group, subcommand])
        }
        _ => KeyPath::new([head]),
    }
}

// ============================================================================
// Registry write API
// ============================================================================

impl Registry {
    /// Registers handler type `H`.
    ///
    /// Stateful registrations share one instance; otherwise a fresh `H` is
    /// constructed for every dispatch that runs it.
    pub fn register<H: Handler + Default>(
        &mut self,
        options: HandlerOptions,
    ) -> RegistryResult<Arc<Descriptor>> {
        let handler = if options.is_stateful() {
            HandlerRef::singleton(Arc::new(H::default()))
        } else {
            HandlerRef::factory::<H>()
        };
        self.register_ref(options, handler)
    }

    /// Registers an already constructed, shared handler.
    pub fn register_instance(
        &mut self,
        options: HandlerOptions,
        handler: Arc<dyn Handler>,
    ) -> RegistryResult<Arc<Descriptor>> {
        self.register_ref(options, HandlerRef::singleton(handler))
    }

    fn register_ref(
        &mut self,
        options: HandlerOptions,
        handler: HandlerRef,
    ) -> RegistryResult<Arc<Descriptor>> {
        let descriptor = Arc::new(options.into_descriptor(handler)?);
        self.add(Arc::clone(&descriptor))?;
        debug!(
            kind = %descriptor.kind(),
            handler = descriptor.name(),
            paths = descriptor.paths().len(),
            "Registered handler"
        );
        Ok(descriptor)
    }
}
