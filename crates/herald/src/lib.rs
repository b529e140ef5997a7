//! # Herald
//!
//! Tree-routed event dispatch for chat platform bots.
//!
//! ## Overview
//!
//! Feature modules register handlers against an event kind and a key path
//! (a channel name, a button id, a command route). Each incoming platform
//! event is resolved to the handlers registered at its key path or at a
//! wildcard above it, filtered by location, role and content, and run one
//! after another. Rejections and mapped failures are answered to the user;
//! everything else goes to telemetry.
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────┐     ┌───────────┐
//! │  Platform   │────▶│  Registry  │────▶│ Filters  │────▶│ Handlers  │
//! │  (Adapter)  │     │  (lookup)  │     │ loc/role │     │ (in order)│
//! └─────────────┘     └────────────┘     │ /content │     └───────────┘
//!        ▲                               └──────────┘           │
//!        └────────────── rejections / mapped errors ────────────┘
//! ```
//!
//! - **Runtime**: startup orchestration, config, logging, event delivery
//! - **Framework**: registry, filter pipeline, dispatcher, interaction router
//! - **Core**: events, occurrences, scopes, the `Bot` and `ErrorReporter`
//!   interfaces
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[derive(Default)]
//! struct Welcome;
//!
//! #[async_trait::async_trait]
//! impl Handler for Welcome {
//!     async fn handle(&self, ctx: &HandlerContext) -> HandlerResult {
//!         // ...
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = HeraldRuntime::builder()
//!         .bot(bot)
//!         .module(module("welcome", |registry| {
//!             registry.register::<Welcome>(
//!                 HandlerOptions::message()
//!                     .channel("welcome")
//!                     .location(Location::Server),
//!             )?;
//!             Ok(())
//!         }))
//!         .start()
//!         .await?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use herald_runtime::{CommandSync, HandlerModule, HeraldRuntime, module};

    // Registration
    pub use herald_framework::{
        CommandOption, CommandSpec, HandlerOptions, Location, OptionKind, RejectReason, Registry,
        autocomplete_fn,
    };

    // Handlers
    pub use herald_framework::{Handler, HandlerContext, handler_fn};

    // Core types for adapters and handlers
    pub use herald_core::{
        Bot, BoxedBot, BoxedEvent, Choice, Event, EventKind, HandlerError, HandlerResult,
        Interaction, InteractionEvent, Occurrence, Scope,
    };
}
