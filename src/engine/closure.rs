//! Closure state machine for (model, period) billing closure.
//!
//! `pending` is implicit: no status row exists yet. A row moves
//! `early_frozen → archiving → completed`, with `failed` reachable from
//! `early_frozen` or `archiving` and retryable. `completed` is terminal;
//! closed periods are corrected, never re-closed.

use serde::{Deserialize, Serialize};

/// Persisted state of a (model, period) closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureState {
    EarlyFrozen,
    Archiving,
    Completed,
    Failed,
}

impl ClosureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureState::EarlyFrozen => "early_frozen",
            ClosureState::Archiving => "archiving",
            ClosureState::Completed => "completed",
            ClosureState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<ClosureState> {
        match s {
            "early_frozen" => Some(ClosureState::EarlyFrozen),
            "archiving" => Some(ClosureState::Archiving),
            "completed" => Some(ClosureState::Completed),
            "failed" => Some(ClosureState::Failed),
            _ => None,
        }
    }

    /// Whether no further transitions are possible. `Failed` is terminal
    /// for the run that produced it but remains retryable.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClosureState::Completed | ClosureState::Failed)
    }
}

/// Whether an archival run may claim the `archiving` state from the
/// observed current state (`None` = implicit pending).
///
/// A run that observes `Archiving` held by another runner must skip, and
/// nothing ever leaves `Completed`.
pub fn may_claim_archival(current: Option<ClosureState>) -> bool {
    match current {
        None => true,
        Some(ClosureState::EarlyFrozen) => true,
        Some(ClosureState::Failed) => true,
        Some(ClosureState::Archiving) => false,
        Some(ClosureState::Completed) => false,
    }
}

impl std::fmt::Display for ClosureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
