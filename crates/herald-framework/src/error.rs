//! Error types for the Herald framework.

use herald_core::{EventKind, KeyPath};
use thiserror::Error;

/// Errors raised while registering handlers.
///
/// Registration runs before any event is processed, so every one of these is
/// fatal to startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The content pattern failed to compile.
    #[error("invalid content pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compile error reported by the regex engine.
        #[source]
        source: regex::Error,
    },

    /// The key path would place a terminal inside a branch or a branch
    /// below a terminal.
    #[error("key path {path} conflicts with an existing {kind} registration")]
    PathConflict {
        /// The event kind being registered.
        kind: EventKind,
        /// The conflicting path.
        path: KeyPath,
    },

    /// A command kind was registered without a command spec.
    #[error("event kind '{kind}' requires a command spec")]
    MissingCommand {
        /// The event kind being registered.
        kind: EventKind,
    },

    /// A command spec was given for a kind that is not command-routed.
    #[error("event kind '{kind}' does not accept a command spec")]
    UnexpectedCommand {
        /// The event kind being registered.
        kind: EventKind,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
