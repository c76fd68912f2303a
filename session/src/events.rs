//! Events emitted by the orchestrator for the host process to log or relay.

use votum_types::{CandidateId, IdentityKey, SessionId, TransactionRef, VoteStatus, VoterAddress};

/// Notable session milestones, drained by the caller.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A new session was allocated.
    SessionStarted { session_id: SessionId },
    /// A capture matched the enrollment.
    IdentityVerified {
        session_id: SessionId,
        identity_key: IdentityKey,
        similarity: f64,
    },
    /// All verification attempts were exhausted.
    VerificationFailed {
        session_id: SessionId,
        attempts: u32,
    },
    /// The wallet granted an authorization.
    AuthorizationGranted {
        session_id: SessionId,
        address: VoterAddress,
    },
    /// The vote reached ledger finality.
    VoteConfirmed {
        session_id: SessionId,
        identity_key: IdentityKey,
        candidate_id: CandidateId,
        reference: TransactionRef,
    },
    /// A second vote attempt for an identity that already has a record.
    DuplicateRejected {
        session_id: SessionId,
        identity_key: IdentityKey,
        existing: VoteStatus,
    },
    /// Submission failed non-retryably.
    VoteFailed {
        session_id: SessionId,
        reason: String,
    },
    /// The session outlived its deadline.
    SessionExpired { session_id: SessionId },
}
