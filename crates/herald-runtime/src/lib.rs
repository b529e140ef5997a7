//! Herald Runtime - Orchestration layer for the Herald event routing engine.
//!
//! This crate provides:
//! - Startup orchestration (`HeraldRuntime`, `RuntimeBuilder`) over an
//!   explicit list of feature modules
//! - Remote command synchronisation through the `CommandSync` collaborator
//! - Layered configuration loading and validation
//! - Logging configuration
//! - Concurrent event delivery with graceful shutdown
//!
//! ```ignore
//! use herald_runtime::{HeraldRuntime, module};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = HeraldRuntime::builder()
//!         .bot(bot)
//!         .module(module("tickets", tickets::register))
//!         .command_sync(platform_commands)
//!         .start()
//!         .await?;
//!
//!     // Hand events to `runtime.deliver(..)` from the platform connection.
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod module;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, HeraldConfig, LoggingConfig,
    load_config, load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use module::{BoxedModule, CommandSync, FnModule, HandlerModule, module};
pub use runtime::{HeraldRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
