//! # Herald Framework
//!
//! The routing engine: registry, filter pipeline, dispatcher and interaction
//! router.
//!
//! This layer provides:
//! - [`Registry`], a per-kind tree of handler descriptors with wildcard
//!   fan-out lookup
//! - [`HandlerOptions`], the registration surface used by feature modules
//! - The eligibility [`filter`] pipeline (location, role, content)
//! - [`Dispatcher`], which runs handlers with deduplication and failure
//!   isolation and also routes platform interactions
//! - Command definitions and the [`CommandIds`] table filled after remote
//!   command registration

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handler;
pub mod interaction;
pub mod registration;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{
    Autocomplete, AutocompleteFn, CommandDefinition, CommandIds, CommandOption, CommandSpec,
    OptionDefinition, OptionKind, SubcommandDefinition, autocomplete_fn,
};
pub use context::HandlerContext;
pub use dispatcher::{DEFAULT_AUTOCOMPLETE_LIMIT, DispatchReport, DispatchSettings, Dispatcher};
pub use error::{RegistryError, RegistryResult};
pub use filter::{FilterResult, Location, RejectReason, Verdict};
pub use handler::{Handler, HandlerFn, HandlerId, HandlerRef, handler_fn};
pub use interaction::RouteOutcome;
pub use registration::{ErrorMessages, HandlerOptions};
pub use registry::{Descriptor, Registry, RegistryStats};
