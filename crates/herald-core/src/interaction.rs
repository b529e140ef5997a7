//! Platform interaction shapes.
//!
//! Interactions (buttons, slash commands, context menus, autocomplete) arrive
//! through a single platform flow. Adapters describe each one with an
//! [`Interaction`], and the interaction router in `herald-framework`
//! translates the shape into an event kind and key path.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventKind, KeyPath, Occurrence, Scope};

/// Identifies the command route an interaction targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Platform-assigned command id.
    pub command_id: String,
    /// Subcommand group name, if the command has groups.
    #[serde(default)]
    pub group: Option<String>,
    /// Subcommand name, if the command has subcommands.
    #[serde(default)]
    pub subcommand: Option<String>,
}

impl CommandInvocation {
    /// Creates an invocation of a top-level command.
    pub fn new(command_id: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            group: None,
            subcommand: None,
        }
    }

    /// Sets the subcommand group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the subcommand.
    pub fn subcommand(mut self, subcommand: impl Into<String>) -> Self {
        self.subcommand = Some(subcommand.into());
        self
    }

    /// Returns `[command id, group or "", subcommand or ""]`.
    pub fn key_path(&self) -> KeyPath {
        KeyPath::new([
            self.command_id.as_str(),
            self.group.as_deref().unwrap_or(KeyPath::WILDCARD),
            self.subcommand.as_deref().unwrap_or(KeyPath::WILDCARD),
        ])
    }
}

/// The option currently being typed in an autocomplete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedOption {
    /// Option name.
    pub name: String,
    /// Partial input typed so far.
    pub value: String,
}

/// The shape of a platform interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// A button click carrying the button's custom id.
    Button {
        /// The custom id set when the button was created.
        custom_id: String,
    },
    /// A slash command invocation.
    SlashCommand(CommandInvocation),
    /// A context-menu command invoked on a message.
    MessageContextMenu {
        /// Platform-assigned command id.
        command_id: String,
    },
    /// A context-menu command invoked on a user.
    UserContextMenu {
        /// Platform-assigned command id.
        command_id: String,
    },
    /// An autocomplete request for a slash-command option.
    Autocomplete {
        /// The command route being completed.
        invocation: CommandInvocation,
        /// The focused option and its partial input.
        focused: FocusedOption,
    },
}

impl Interaction {
    /// Returns the event kind this interaction dispatches as.
    ///
    /// Autocomplete requests are answered directly and never dispatched, so
    /// they have no kind.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Button { .. } => Some(EventKind::Button),
            Self::SlashCommand(_) => Some(EventKind::SlashCommand),
            Self::MessageContextMenu { .. } => Some(EventKind::MessageContextMenu),
            Self::UserContextMenu { .. } => Some(EventKind::UserContextMenu),
            Self::Autocomplete { .. } => None,
        }
    }

    /// Returns the registry key path addressed by this interaction.
    pub fn key_path(&self) -> KeyPath {
        match self {
            Self::Button { custom_id } => KeyPath::from(custom_id.as_str()),
            Self::SlashCommand(invocation) => invocation.key_path(),
            Self::MessageContextMenu { command_id } | Self::UserContextMenu { command_id } => {
                KeyPath::from(command_id.as_str())
            }
            Self::Autocomplete { invocation, .. } => invocation.key_path(),
        }
    }

    /// Builds the occurrence an interaction is routed as.
    pub fn occurrence(&self, scope: Option<Scope>) -> Occurrence {
        Occurrence {
            key_path: self.key_path(),
            scope,
        }
    }
}

/// A raw platform event that is an interaction.
///
/// Implementations typically forward [`Event::occurrences`] to
/// [`Interaction::occurrence`] so direct dispatch and routed dispatch agree.
pub trait InteractionEvent: Event {
    /// Describes the interaction shape.
    fn interaction(&self) -> Interaction;

    /// Eligibility data of the invoking user, if any.
    fn scope(&self) -> Option<Scope>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_key_path_uses_wildcards_for_missing_parts() {
        let invocation = CommandInvocation::new("abc123").subcommand("ping");
        assert_eq!(invocation.key_path(), KeyPath::from(["abc123", "", "ping"]));

        let grouped = CommandInvocation::new("abc123").group("admin").subcommand("ban");
        assert_eq!(grouped.key_path(), KeyPath::from(["abc123", "admin", "ban"]));
    }

    #[test]
    fn test_interaction_kinds() {
        let button = Interaction::Button {
            custom_id: "close-ticket".into(),
        };
        assert_eq!(button.kind(), Some(EventKind::Button));
        assert_eq!(button.key_path(), KeyPath::from("close-ticket"));

        let menu = Interaction::UserContextMenu {
            command_id: "987".into(),
        };
        assert_eq!(menu.kind(), Some(EventKind::UserContextMenu));
        assert_eq!(menu.key_path(), KeyPath::from("987"));

        let autocomplete = Interaction::Autocomplete {
            invocation: CommandInvocation::new("abc"),
            focused: FocusedOption::default(),
        };
        assert_eq!(autocomplete.kind(), None);
        assert_eq!(autocomplete.key_path(), KeyPath::from(["abc", "", ""]));
    }

    #[test]
    fn test_occurrence_carries_scope() {
        let interaction = Interaction::SlashCommand(CommandInvocation::new("abc"));
        let occurrence = interaction.occurrence(Some(Scope::direct_message()));
        assert_eq!(occurrence.key_path, KeyPath::from(["abc", "", ""]));
        assert!(occurrence.scope.is_some_and(|s| s.direct_message));
    }
}
