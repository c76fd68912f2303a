use thiserror::Error;

use votum_chain::ChainError;
use votum_store::StoreError;
use votum_types::{CandidateId, SessionId, VoteStatus};
use votum_verifier::VerifierError;

use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("session has expired")]
    Expired,

    #[error("operation '{op}' not allowed in state {state}")]
    WrongState {
        op: &'static str,
        state: SessionState,
    },

    #[error("verification failed after {attempts} attempts")]
    VerificationFailed { attempts: u32 },

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("identity has already voted (existing record: {0})")]
    DuplicateVote(VoteStatus),

    #[error("vote submission failed: {0}")]
    SubmissionFailed(String),

    #[error("unknown candidate: {0}")]
    UnknownCandidate(CandidateId),

    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("verifier error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("ledger error: {0}")]
    Chain(#[from] ChainError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}
