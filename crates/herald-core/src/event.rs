//! Event system for Herald.
//!
//! This module provides the core event infrastructure:
//!
//! - [`EventKind`] - The closed set of platform event categories
//! - [`Event`] - Base trait implemented by every raw platform payload
//! - [`BoxedEvent`] - Cheaply cloneable, type-erased event handle
//! - [`KeyPath`] / [`Occurrence`] / [`Scope`] - The routing metadata derived
//!   from a raw event at dispatch time
//!
//! The dispatcher never inspects platform payloads itself. Adapters implement
//! [`Event::occurrences`] to describe where an event should be routed and
//! which eligibility data (location, roles, content) it carries.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Event Kind
// ============================================================================

/// Classification of platform events.
///
/// Each kind owns its own registry tree, and the kind decides which key-path
/// semantics apply (channel name for messages, command id for slash commands,
/// custom id for buttons, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A message posted in a channel or direct message.
    Message,
    /// A button component was clicked.
    Button,
    /// A slash command was invoked.
    SlashCommand,
    /// A context-menu command was invoked on a message.
    MessageContextMenu,
    /// A context-menu command was invoked on a user.
    UserContextMenu,
    /// A reaction was added to a message.
    ReactionAdd,
    /// A reaction was removed from a message.
    ReactionRemove,
    /// A member joined a server.
    MemberJoin,
    /// A member left a server.
    MemberLeave,
    /// A member's roles or profile changed.
    MemberUpdate,
    /// A member's voice state changed.
    VoiceStateUpdate,
    /// A thread was created.
    ThreadCreate,
    /// The platform connection became ready.
    Ready,
    /// A scheduled timer fired.
    Timer,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [EventKind; 14] = [
        EventKind::Message,
        EventKind::Button,
        EventKind::SlashCommand,
        EventKind::MessageContextMenu,
        EventKind::UserContextMenu,
        EventKind::ReactionAdd,
        EventKind::ReactionRemove,
        EventKind::MemberJoin,
        EventKind::MemberLeave,
        EventKind::MemberUpdate,
        EventKind::VoiceStateUpdate,
        EventKind::ThreadCreate,
        EventKind::Ready,
        EventKind::Timer,
    ];

    /// Returns the canonical snake_case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Button => "button",
            Self::SlashCommand => "slash_command",
            Self::MessageContextMenu => "message_context_menu",
            Self::UserContextMenu => "user_context_menu",
            Self::ReactionAdd => "reaction_add",
            Self::ReactionRemove => "reaction_remove",
            Self::MemberJoin => "member_join",
            Self::MemberLeave => "member_leave",
            Self::MemberUpdate => "member_update",
            Self::VoiceStateUpdate => "voice_state_update",
            Self::ThreadCreate => "thread_create",
            Self::Ready => "ready",
            Self::Timer => "timer",
        }
    }

    /// Returns `true` for kinds whose registry is keyed by a remote command id.
    ///
    /// These subtrees are rebuilt once after remote command registration.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Self::SlashCommand | Self::MessageContextMenu | Self::UserContextMenu
        )
    }

    /// Returns `true` for kinds delivered through the platform interaction flow.
    pub fn is_interaction(&self) -> bool {
        self.is_command() || matches!(self, Self::Button)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown event kind name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

// ============================================================================
// Key Path
// ============================================================================

/// An ordered sequence of segments addressing handlers inside one kind's
/// registry tree.
///
/// The empty segment is reserved as the wildcard: a handler registered with
/// an empty segment matches any concrete value at that position, and an
/// occurrence carrying an empty segment places no constraint there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// The wildcard segment.
    pub const WILDCARD: &'static str = "";

    /// Creates a key path from any sequence of string-like segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The empty path, which addresses the root of a registry tree.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns the segments of this path.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if segment.is_empty() {
                write!(f, "*")?;
            } else {
                write!(f, "{segment}")?;
            }
        }
        write!(f, "]")
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<&str> for KeyPath {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_string()])
    }
}

// ============================================================================
// Occurrence
// ============================================================================

/// Eligibility data carried by an occurrence.
///
/// An occurrence without a scope describes an event kind where location,
/// role and content constraints do not apply; every filter stage passes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Whether the event originated in a direct message.
    pub direct_message: bool,
    /// Role names of the invoking member, if the event has one.
    pub roles: Option<Vec<String>>,
    /// Textual content of the event, if any.
    pub content: Option<String>,
}

impl Scope {
    /// A scope originating in a server channel.
    pub fn server() -> Self {
        Self::default()
    }

    /// A scope originating in a direct message.
    pub fn direct_message() -> Self {
        Self {
            direct_message: true,
            ..Self::default()
        }
    }

    /// Sets the invoking member's role names.
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the textual content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// One concrete, filterable instance of an event ready for matching.
///
/// A single raw event may yield several occurrences, for example a message
/// that should be routed both by channel and by thread parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The concrete key path to resolve against the registry.
    pub key_path: KeyPath,
    /// Eligibility data, or `None` when eligibility does not apply.
    pub scope: Option<Scope>,
}

impl Occurrence {
    /// Creates an occurrence without eligibility data.
    pub fn new(key_path: impl Into<KeyPath>) -> Self {
        Self {
            key_path: key_path.into(),
            scope: None,
        }
    }

    /// Creates an occurrence with eligibility data.
    pub fn scoped(key_path: impl Into<KeyPath>, scope: Scope) -> Self {
        Self {
            key_path: key_path.into(),
            scope: Some(scope),
        }
    }
}

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for raw platform events.
///
/// Events are type-erased behind [`BoxedEvent`] and handed to handlers
/// unmodified; handlers recover the concrete payload with
/// [`BoxedEvent::downcast`].
pub trait Event: Any + Send + Sync {
    /// Returns the kind of this event.
    fn kind(&self) -> EventKind;

    /// Derives the occurrences this event should be routed as.
    fn occurrences(&self) -> Vec<Occurrence>;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a serialisable summary attached to failure reports.
    fn describe(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// A type-erased, cheaply cloneable event handle.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Boxes a concrete event.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Wraps an already shared event.
    pub fn from_arc(inner: Arc<dyn Event>) -> Self {
        Self { inner }
    }

    /// Attempts to view the event as a concrete type.
    pub fn downcast<T: Event>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Returns `true` if the event is of concrete type `T`.
    pub fn is<T: Event>(&self) -> bool {
        self.inner.as_any().is::<T>()
    }
}

impl Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("kind", &self.inner.kind())
            .finish()
    }
}
