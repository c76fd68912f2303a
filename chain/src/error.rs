use thiserror::Error;
use votum_types::CandidateId;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The submission may or may not have reached the ledger — safe to retry
    /// only after checking for an existing transaction.
    #[error("transient submission error: {0}")]
    TransientSubmit(String),

    /// The ledger definitively rejected the transaction. Not retryable.
    #[error("rejected by ledger: {0}")]
    Rejected(String),

    #[error("unknown candidate: {0}")]
    UnknownCandidate(CandidateId),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("malformed ledger response: {0}")]
    Protocol(String),
}

impl ChainError {
    /// Whether a retry (guarded by a `find_vote` check) is allowed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientSubmit(_) | Self::Unavailable(_))
    }
}
