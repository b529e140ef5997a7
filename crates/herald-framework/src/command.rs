//! Command definitions and the command name to id table.
//!
//! Slash commands and context-menu commands are registered locally by name.
//! After the runtime synchronises them with the platform, the platform assigns
//! each command an id; [`CommandIds`] keeps that mapping for the life of the
//! process and the registry's command subtrees are rekeyed from name to id.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{BoxedEvent, Choice, HandlerError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ============================================================================
// Autocomplete
// ============================================================================

/// Suggests values for a partially typed command option.
#[async_trait]
pub trait Autocomplete: Send + Sync + 'static {
    /// Returns suggestions for `input`.
    async fn complete(&self, input: &str, event: &BoxedEvent) -> Result<Vec<Choice>, HandlerError>;
}

/// Autocomplete callback built from an async closure.
pub struct AutocompleteFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Autocomplete for AutocompleteFn<F>
where
    F: Fn(String, BoxedEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Choice>, HandlerError>> + Send + 'static,
{
    async fn complete(&self, input: &str, event: &BoxedEvent) -> Result<Vec<Choice>, HandlerError> {
        (self.f)(input.to_string(), event.clone()).await
    }
}

/// Converts an async closure into an autocomplete callback.
pub fn autocomplete_fn<F, Fut>(f: F) -> Arc<dyn Autocomplete>
where
    F: Fn(String, BoxedEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Choice>, HandlerError>> + Send + 'static,
{
    Arc::new(AutocompleteFn { f })
}

// ============================================================================
// Command Spec
// ============================================================================

/// Value type of a command option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
}

/// One option of a slash command.
#[derive(Clone)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub autocomplete: Option<Arc<dyn Autocomplete>>,
}

impl CommandOption {
    /// Creates an optional string option.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: OptionKind::default(),
            required: false,
            autocomplete: None,
        }
    }

    pub fn kind(mut self, kind: OptionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Attaches an autocomplete callback.
    pub fn autocomplete(mut self, callback: Arc<dyn Autocomplete>) -> Self {
        self.autocomplete = Some(callback);
        self
    }

    /// Returns the platform-facing definition of this option.
    pub fn definition(&self) -> OptionDefinition {
        OptionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
            required: self.required,
            autocomplete: self.autocomplete.is_some(),
        }
    }
}

impl fmt::Debug for CommandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOption")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

/// Local definition of a slash or context-menu command.
///
/// A handler registered for a subcommand names the parent command, an
/// optional subcommand group and the subcommand itself. Context-menu commands
/// use only `name`.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub group: Option<String>,
    pub subcommand: Option<String>,
    pub options: Vec<CommandOption>,
}

impl CommandSpec {
    /// Creates a top-level command.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Places this handler under a subcommand group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Places this handler on a subcommand.
    pub fn subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }

    /// Adds an option.
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Finds an option by name.
    pub fn find_option(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|option| option.name == name)
    }

    /// Key path below the command segment: `[group or "", subcommand or ""]`.
    pub fn route(&self) -> [&str; 2] {
        [
            self.group.as_deref().unwrap_or_default(),
            self.subcommand.as_deref().unwrap_or_default(),
        ]
    }
}

// ============================================================================
// Definitions sent to the platform
// ============================================================================

/// Serialisable option definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub autocomplete: bool,
}

/// Serialisable subcommand definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub options: Vec<OptionDefinition>,
}

/// A command as submitted to the platform's remote command registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub kind: herald_core::EventKind,
    pub description: String,
    pub options: Vec<OptionDefinition>,
    pub subcommands: Vec<SubcommandDefinition>,
}

// ============================================================================
// CommandIds
// ============================================================================

/// Process-lifetime mapping from command name to platform-assigned id.
#[derive(Debug, Default)]
pub struct CommandIds {
    ids: RwLock<HashMap<String, String>>,
}

impl CommandIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole table.
    pub fn replace(&self, ids: HashMap<String, String>) {
        *self.ids.write() = ids;
    }

    /// Returns the id for `name`, if the command was synchronised.
    pub fn get(&self, name: &str) -> Option<String> {
        self.ids.read().get(name).cloned()
    }

    /// Renders a clickable mention such as `</ping:123>`.
    pub fn mention(&self, name: &str) -> Option<String> {
        self.get(name).map(|id| format!("</{name}:{id}>"))
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }
}
