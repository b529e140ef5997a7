//! Runtime error types.

use herald_core::BoxError;
use herald_framework::RegistryError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort runtime startup.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A feature module failed to register its handlers.
    #[error("Module '{module}' failed to register: {source}")]
    Module {
        module: String,
        #[source]
        source: RegistryError,
    },

    /// Remote command registration failed.
    #[error("Command synchronisation failed: {0}")]
    CommandSync(#[source] BoxError),

    /// Command handlers could not be rekeyed by platform id.
    #[error("Failed to rekey command handlers: {0}")]
    Rekey(#[source] RegistryError),

    /// No bot was supplied to the builder.
    #[error("No bot configured")]
    MissingBot,

    /// Waiting for the shutdown signal failed.
    #[error("Signal error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
