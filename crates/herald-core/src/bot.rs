//! Outbound platform interface.
//!
//! The [`Bot`] trait is the engine's only way of talking back to the chat
//! platform: sending rejection replies into the context an event came from
//! and answering autocomplete requests. Everything else a handler does with
//! the platform is its own business.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::event::BoxedEvent;
use crate::reply::{Choice, Rejection};

/// The platform client as seen by the dispatcher.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Returns the bot's identifier, used in logs.
    fn id(&self) -> &str;

    /// Sends a user-visible rejection into the context `event` originated from
    /// (channel reply or interaction reply).
    async fn send_rejection(&self, event: &BoxedEvent, rejection: &Rejection) -> ApiResult<()>;

    /// Answers an autocomplete request with the given suggestions.
    async fn respond_autocomplete(&self, event: &BoxedEvent, choices: Vec<Choice>)
    -> ApiResult<()>;
}

/// A shared bot handle.
pub type BoxedBot = Arc<dyn Bot>;
