//! Handler context.
//!
//! [`HandlerContext`] is what every handler receives: the raw event exactly
//! as the platform delivered it, the event kind it was dispatched as, and the
//! bot it arrived through.

use herald_core::{BoxedBot, BoxedEvent, Event, EventKind};

/// The context object passed to handlers during dispatch.
///
/// Cloning is cheap; both the event and the bot are reference counted.
#[derive(Clone)]
pub struct HandlerContext {
    kind: EventKind,
    event: BoxedEvent,
    bot: BoxedBot,
}

impl HandlerContext {
    /// Creates a new context.
    pub fn new(kind: EventKind, event: BoxedEvent, bot: BoxedBot) -> Self {
        Self { kind, event, bot }
    }

    /// Returns the kind this event was dispatched as.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the raw event.
    pub fn event(&self) -> &BoxedEvent {
        &self.event
    }

    /// Returns the raw event as a concrete type, if it is one.
    pub fn payload<T: Event>(&self) -> Option<&T> {
        self.event.downcast::<T>()
    }

    /// Returns the bot the event arrived through.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("kind", &self.kind)
            .field("event", &self.event)
            .field("bot", &self.bot.id())
            .finish()
    }
}
