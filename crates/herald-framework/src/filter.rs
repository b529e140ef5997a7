//! Eligibility filter pipeline.
//!
//! Every candidate handler found for an occurrence passes through three
//! stages, always in this order:
//!
//! 1. **location** – direct message vs server
//! 2. **role** – the member holds at least one allowed role
//! 3. **content** – the content matches the handler's pattern
//!
//! The first failing stage decides the [`RejectReason`]; later stages are not
//! evaluated. Occurrences without a [`Scope`] pass every stage, since
//! eligibility does not apply to their event kind.

use std::fmt;
use std::sync::Arc;

use herald_core::{Occurrence, Scope};
use serde::{Deserialize, Serialize};

use crate::registry::Descriptor;

/// Where a handler may be triggered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Direct messages and servers.
    #[default]
    Anywhere,
    /// Direct messages only.
    DirectMessage,
    /// Server channels only.
    Server,
}

impl Location {
    /// Returns `true` if an event from the given origin is allowed.
    pub fn allows(&self, direct_message: bool) -> bool {
        match self {
            Self::Anywhere => true,
            Self::DirectMessage => direct_message,
            Self::Server => !direct_message,
        }
    }
}

/// Why a candidate was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// The event came from a location the handler does not accept.
    WrongLocation,
    /// The member holds none of the handler's allowed roles.
    MissingRole,
    /// The content does not match the handler's pattern.
    ContentMismatch,
}

impl RejectReason {
    /// Key under which a handler configures the user message for this reason.
    pub fn key(&self) -> &'static str {
        match self {
            Self::WrongLocation => "WRONG_LOCATION",
            Self::MissingRole => "MISSING_ROLE",
            Self::ContentMismatch => "CONTENT_MISMATCH",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WrongLocation => "wrong location",
            Self::MissingRole => "missing role",
            Self::ContentMismatch => "content does not match pattern",
        })
    }
}

/// Outcome of filtering one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The handler should run.
    Accepted,
    /// The handler was filtered out.
    Rejected(RejectReason),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A candidate descriptor tagged with its verdict for one occurrence.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// The candidate.
    pub descriptor: Arc<Descriptor>,
    /// Index of the occurrence within the dispatch.
    pub occurrence: usize,
    /// The verdict.
    pub verdict: Verdict,
}

// ============================================================================
// Stages
// ============================================================================

/// One predicate of the pipeline.
pub trait FilterStage: Sync {
    /// Checks a descriptor against an occurrence's scope.
    fn check(&self, descriptor: &Descriptor, scope: &Scope) -> Result<(), RejectReason>;
}

/// Rejects events from locations the handler does not accept.
pub struct LocationStage;

impl FilterStage for LocationStage {
    fn check(&self, descriptor: &Descriptor, scope: &Scope) -> Result<(), RejectReason> {
        if descriptor.location().allows(scope.direct_message) {
            Ok(())
        } else {
            Err(RejectReason::WrongLocation)
        }
    }
}

/// Rejects members holding none of the allowed roles.
pub struct RoleStage;

impl FilterStage for RoleStage {
    fn check(&self, descriptor: &Descriptor, scope: &Scope) -> Result<(), RejectReason> {
        let allowed = descriptor.roles();
        if allowed.is_empty() {
            return Ok(());
        }
        let held = scope.roles.as_deref().unwrap_or_default();
        if held.iter().any(|role| allowed.contains(role)) {
            Ok(())
        } else {
            Err(RejectReason::MissingRole)
        }
    }
}

/// Rejects content that does not match the handler's pattern.
pub struct ContentStage;

impl FilterStage for ContentStage {
    fn check(&self, descriptor: &Descriptor, scope: &Scope) -> Result<(), RejectReason> {
        let Some(pattern) = descriptor.pattern() else {
            return Ok(());
        };
        match scope.content.as_deref() {
            Some(content) if pattern.is_match(content) => Ok(()),
            _ => Err(RejectReason::ContentMismatch),
        }
    }
}

/// The stages in evaluation order.
pub const STAGES: [&dyn FilterStage; 3] = [&LocationStage, &RoleStage, &ContentStage];

// ============================================================================
// Pipeline
// ============================================================================

/// Evaluates one descriptor against one occurrence.
pub fn evaluate(descriptor: &Descriptor, occurrence: &Occurrence) -> Verdict {
    let Some(scope) = &occurrence.scope else {
        return Verdict::Accepted;
    };
    STAGES
        .iter()
        .find_map(|stage| stage.check(descriptor, scope).err())
        .map_or(Verdict::Accepted, Verdict::Rejected)
}

/// Filters candidates for one occurrence, preserving candidate order.
pub fn run(
    candidates: Vec<Arc<Descriptor>>,
    occurrence: &Occurrence,
    occurrence_index: usize,
) -> Vec<FilterResult> {
    candidates
        .into_iter()
        .map(|descriptor| {
            let verdict = evaluate(&descriptor, occurrence);
            FilterResult {
                descriptor,
                occurrence: occurrence_index,
                verdict,
            }
        })
        .collect()
}
