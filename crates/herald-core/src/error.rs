//! Error types shared across Herald crates.
//!
//! Registry and runtime errors live with their components; this module only
//! holds the errors that cross the boundary between the engine and its
//! collaborators (handlers and the platform client).

use std::any::Any;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error type used for opaque error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Handler Errors
// =============================================================================

/// Failure returned by a handler's business logic.
///
/// The message text is the classification key: when a handler's configured
/// error messages contain an entry for it, the failure becomes a user-facing
/// rejection instead of an internal error. Structured parameters travel with
/// the rejection so the mapped text can reference them.
#[derive(Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    params: Map<String, Value>,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    /// Creates a handler error with the given message text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            params: Map::new(),
            source: None,
        }
    }

    /// Wraps an arbitrary error, using its display text as the message.
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: err.to_string(),
            params: Map::new(),
            source: Some(Box::new(err)),
        }
    }

    /// Builds an error from a caught panic payload.
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(format!("handler panicked: {detail}"))
    }

    /// Attaches a structured parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Attaches an underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured parameters.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("message", &self.message)
            .field("params", &self.params)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by outbound platform calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform client is not connected.
    #[error("platform client is not connected")]
    NotConnected,

    /// The platform refused the call.
    #[error("platform rejected the call: {reason}")]
    Rejected {
        /// Reason reported by the platform.
        reason: String,
    },

    /// The call failed in transit.
    #[error("transport error: {0}")]
    Transport(String),

    /// The interaction token expired before a reply was sent.
    #[error("interaction expired")]
    Expired,
}

impl ApiError {
    /// Creates a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Result type for outbound platform calls.
pub type ApiResult<T> = Result<T, ApiError>;
