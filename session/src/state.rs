//! Session state tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use votum_types::{SessionId, Timestamp, TransactionRecord};
use votum_verifier::VerificationResult;
use votum_wallet::Authorization;

use crate::error::SessionError;

/// The current phase of a voting session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session allocated, nothing has happened yet.
    Idle,
    /// Waiting for a biometric capture.
    Capturing,
    /// A capture is being matched by the identity verifier.
    Verifying,
    /// Identity verified; waiting for wallet authorization.
    Verified,
    /// A wallet prompt is outstanding.
    Authorizing,
    /// Authorization granted; ready to cast.
    Authorized,
    /// Claiming the identity's vote slot in the idempotency ledger.
    Reserving,
    /// A ledger submission is in flight.
    Submitting,
    /// Submitted; awaiting ledger finality.
    Submitted,
    /// The vote is final.
    Confirmed,
    /// All verification attempts exhausted.
    VerificationFailed,
    /// The wallet prompt failed or was declined (recoverable).
    AuthorizationFailed,
    /// This identity has already voted.
    DuplicateVote,
    /// Submission failed non-retryably; row kept for reconciliation.
    SubmissionFailed,
    /// The session outlived its deadline.
    Expired,
}

impl SessionState {
    /// Whether no further transition out of this state occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed
                | Self::VerificationFailed
                | Self::DuplicateVote
                | Self::SubmissionFailed
                | Self::Expired
        )
    }

    /// Whether a session in this state may be moved to `Expired` by the
    /// expiry sweep.
    ///
    /// The reserve/submit/confirm critical section is excluded: once a
    /// reservation exists, the pipeline owns the session until it reaches a
    /// terminal state on its own bounded schedule.
    pub fn is_expirable(&self) -> bool {
        !self.is_terminal()
            && !matches!(self, Self::Reserving | Self::Submitting | Self::Submitted)
    }

    /// Whether the forward edge `self → to` exists in the session graph.
    ///
    /// Every non-terminal state may expire; everything else is the pipeline
    /// order plus the two sanctioned loops — re-capture after a failed
    /// verification attempt, re-prompt after a failed authorization, and
    /// re-submission of the same reserved vote.
    pub fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;
        if self.is_terminal() {
            return false;
        }
        if to == Expired {
            return true;
        }
        matches!(
            (self, to),
            (Idle, Capturing)
                | (Capturing, Verifying)
                | (Verifying, Verified)
                | (Verifying, Capturing)
                | (Verifying, VerificationFailed)
                | (Verified, Authorizing)
                | (Authorizing, Authorized)
                | (Authorizing, AuthorizationFailed)
                | (AuthorizationFailed, Authorizing)
                | (Authorized, Reserving)
                | (Reserving, Submitting)
                | (Reserving, DuplicateVote)
                | (Submitting, Submitted)
                | (Submitting, SubmissionFailed)
                | (Submitted, Confirmed)
                | (Submitted, Submitting)
                | (Submitted, SubmissionFailed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Reserving => "reserving",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::VerificationFailed => "verification_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::DuplicateVote => "duplicate_vote",
            Self::SubmissionFailed => "submission_failed",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// One voter attempt, from capture to confirmation or failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VotingSession {
    pub session_id: SessionId,
    pub state: SessionState,
    /// Voter-supplied registration identifier. Never mutated after creation.
    pub claimed_identity: String,
    /// The latest capture's result; a fresh capture replaces it wholesale.
    pub verification: Option<VerificationResult>,
    pub authorization: Option<Authorization>,
    pub transaction: Option<TransactionRecord>,
    /// Biometric captures consumed so far.
    pub verify_attempts: u32,
    /// Why the most recent step failed, for the UI.
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub expires_at: Timestamp,
}

impl VotingSession {
    /// Allocate a session in `Idle` with its expiry deadline fixed.
    pub fn new(claimed_identity: String, now: Timestamp, timeout_secs: u64) -> Self {
        Self {
            session_id: SessionId::generate(),
            state: SessionState::Idle,
            claimed_identity,
            verification: None,
            authorization: None,
            transaction: None,
            verify_attempts: 0,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            expires_at: now.plus(timeout_secs),
        }
    }

    /// Whether the session's deadline has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_past(now)
    }

    /// Move to `to`, rejecting edges outside the session graph.
    ///
    /// An illegal edge is an internal invariant violation, not a user
    /// error — the caller aborts the session rather than retrying.
    pub fn transition(&mut self, to: SessionState, now: Timestamp) -> Result<(), SessionError> {
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(session = %self.session_id, from = %self.state, to = %to, "session transition");
        self.state = to;
        self.updated_at = now;
        Ok(())
    }
}
