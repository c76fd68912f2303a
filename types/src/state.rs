//! Status of a vote record in the idempotency ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a vote record, keyed by identity.
///
/// Transitions are monotonic: `Reserved → Submitted → Confirmed`, with
/// `Failed` reachable from any non-terminal status. `Confirmed` and `Failed`
/// are terminal; a `Failed` row is kept for operator reconciliation, never
/// deleted or replayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteStatus {
    /// Identity has claimed its vote slot; nothing submitted yet.
    Reserved,
    /// A transaction has been handed to the ledger.
    Submitted,
    /// The ledger confirmed the transaction as final.
    Confirmed,
    /// Submission failed non-retryably; awaiting reconciliation.
    Failed,
}

impl VoteStatus {
    /// Whether no further transition out of this status is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// `Submitted → Submitted` is permitted (a retry reuses the reserved
    /// row), and `Confirmed → Confirmed` is an idempotent no-op handled by
    /// the store.
    pub fn can_advance_to(&self, next: VoteStatus) -> bool {
        use VoteStatus::*;
        matches!(
            (self, next),
            (Reserved, Submitted)
                | (Submitted, Submitted)
                | (Submitted, Confirmed)
                | (Reserved, Failed)
                | (Submitted, Failed)
        )
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Reserved => "reserved",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
