//! # Herald Core
//!
//! Foundation types for the Herald event routing engine.
//!
//! This crate defines the vocabulary shared by the engine and its
//! collaborators:
//!
//! - **Events**: [`EventKind`], the [`Event`] trait and [`BoxedEvent`] handle
//! - **Routing metadata**: [`KeyPath`], [`Occurrence`] and [`Scope`]
//! - **Interactions**: [`Interaction`] shapes and the [`InteractionEvent`] trait
//! - **Outbound interfaces**: [`Bot`] for platform replies and
//!   [`ErrorReporter`] for failure telemetry
//! - **Errors**: [`HandlerError`] returned by handlers, [`ApiError`] returned
//!   by platform calls
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────┐
//! │  Platform   │────▶│ Dispatcher │────▶│  Handler  │
//! │  (Adapter)  │     │ (Registry) │────▶│  Handler  │
//! └─────────────┘     └────────────┘────▶│  Handler  │
//!        ▲                  │            └───────────┘
//!        └── rejections ────┘
//! ```

pub mod bot;
pub mod error;
pub mod event;
pub mod interaction;
pub mod reply;
pub mod telemetry;

pub use bot::{Bot, BoxedBot};
pub use error::{ApiError, ApiResult, BoxError, HandlerError, HandlerResult};
pub use event::{BoxedEvent, Event, EventKind, KeyPath, Occurrence, Scope, UnknownEventKind};
pub use interaction::{CommandInvocation, FocusedOption, Interaction, InteractionEvent};
pub use reply::{Choice, Rejection};
pub use telemetry::{BoxedReporter, ErrorReporter, FailureReport, TracingReporter};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        BoxedEvent, Event, EventKind, HandlerError, HandlerResult, KeyPath, Occurrence, Scope,
    };
}
