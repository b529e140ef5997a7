//! Handler system for Herald.
//!
//! A [`Handler`] is a feature's business logic. Handlers are registered either
//! as a shared singleton (constructed once, state kept across dispatches) or as
//! a factory that builds a fresh instance for every dispatch. [`HandlerRef`]
//! is the tagged form stored in the registry and [`HandlerId`] is the identity
//! the dispatcher deduplicates on.
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_framework::{Handler, HandlerContext, handler_fn};
//!
//! #[derive(Default)]
//! struct Ping;
//!
//! #[async_trait::async_trait]
//! impl Handler for Ping {
//!     async fn handle(&self, ctx: &HandlerContext) -> HandlerResult {
//!         // ...
//!         Ok(())
//!     }
//! }
//!
//! // Closures work too:
//! let audit = handler_fn(|ctx: HandlerContext| async move {
//!     tracing::info!(kind = %ctx.kind(), "audit");
//!     Ok(())
//! });
//! ```

use std::any::{TypeId, type_name};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::HandlerResult;

use crate::context::HandlerContext;

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for event handlers.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one dispatched event.
    ///
    /// Returning an error whose message matches one of the handler's
    /// configured error messages sends that message to the user; any other
    /// error is reported to telemetry.
    async fn handle(&self, ctx: &HandlerContext) -> HandlerResult;

    /// Returns a name used in logs and failure reports.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

// ============================================================================
// HandlerFn - Convert closures into handlers
// ============================================================================

/// A wrapper that turns an async closure into a [`Handler`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
    name: &'static str,
}

impl<F> HandlerFn<F> {
    /// Overrides the name reported in logs.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: &HandlerContext) -> HandlerResult {
        (self.f)(ctx.clone()).await
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Converts an async closure into a handler.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn {
        f,
        name: type_name::<F>(),
    }
}

// ============================================================================
// HandlerRef - Singleton or per-dispatch factory
// ============================================================================

/// Constructs a fresh handler instance for each dispatch.
#[derive(Clone, Copy)]
pub struct Factory {
    type_id: TypeId,
    name: &'static str,
    construct: fn() -> Box<dyn Handler>,
}

fn construct<H: Handler + Default>() -> Box<dyn Handler> {
    Box::new(H::default())
}

impl Factory {
    /// Creates a factory for handler type `H`.
    pub fn of<H: Handler + Default>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            name: type_name::<H>(),
            construct: construct::<H>,
        }
    }
}

/// Identity of a registered handler.
///
/// Singletons are identified by allocation, factories by handler type, so
/// the same handler reached through several registry branches runs once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerId {
    /// A shared instance, keyed by its address.
    Instance(usize),
    /// A factory, keyed by the handler type it constructs.
    Type(TypeId),
}

/// A registered handler: either a shared instance or a factory.
#[derive(Clone)]
pub enum HandlerRef {
    /// One instance shared by every dispatch.
    Singleton(Arc<dyn Handler>),
    /// A fresh instance per dispatch.
    Factory(Factory),
}

impl HandlerRef {
    /// Wraps a shared instance.
    pub fn singleton(handler: Arc<dyn Handler>) -> Self {
        Self::Singleton(handler)
    }

    /// Creates a per-dispatch factory for `H`.
    pub fn factory<H: Handler + Default>() -> Self {
        Self::Factory(Factory::of::<H>())
    }

    /// Returns the identity used for deduplication.
    pub fn id(&self) -> HandlerId {
        match self {
            Self::Singleton(handler) => {
                HandlerId::Instance(Arc::as_ptr(handler).cast::<()>() as usize)
            }
            Self::Factory(factory) => HandlerId::Type(factory.type_id),
        }
    }

    /// Returns the handler's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Singleton(handler) => handler.name(),
            Self::Factory(factory) => factory.name,
        }
    }

    /// Resolves to a concrete instance, constructing one for factories.
    pub fn resolve(&self) -> Arc<dyn Handler> {
        match self {
            Self::Singleton(handler) => Arc::clone(handler),
            Self::Factory(factory) => Arc::from((factory.construct)()),
        }
    }
}

impl std::fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::Singleton(_) => "Singleton",
            Self::Factory(_) => "Factory",
        };
        f.debug_struct("HandlerRef")
            .field("kind", &variant)
            .field("name", &self.name())
            .finish()
    }
}
