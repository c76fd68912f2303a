//! Ledger client for the external vote contract.
//!
//! The contract surface is deliberately narrow: `vote(candidate_id)` and
//! `getCandidate(candidate_id)`, plus transaction status observation. The
//! service depends only on this interface, never on the ledger's consensus
//! or storage layout.
//!
//! The one subtle obligation lives in [`LedgerClient::find_vote`]: after a
//! submit whose outcome was lost (network dropped between submission and
//! confirmation), the caller must be able to ask "does a vote from this
//! address for this candidate already exist?" before resubmitting. Blind
//! resubmission on unknown outcome is the classic double-vote bug.

pub mod error;
pub mod http;

pub use error::ChainError;
pub use http::HttpLedgerClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use votum_types::{CandidateId, TransactionRef, VoterAddress};
use votum_wallet::Authorization;

/// A candidate as the ledger reports it. Read-only to this service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub vote_count: u64,
}

/// One observation of a submitted transaction's fate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// The ledger guarantees the transaction will not be reverted.
    Confirmed,
    /// Not yet final; observe again later.
    Pending,
    /// The ledger rejected the transaction after submission.
    Failed { reason: String },
}

/// Client for the external vote ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a vote transaction. Returns the ledger-assigned reference.
    async fn submit(
        &self,
        candidate_id: CandidateId,
        authorization: &Authorization,
    ) -> Result<TransactionRef, ChainError>;

    /// Observe the current status of a submitted transaction once. The
    /// caller owns the polling loop and its deadline.
    async fn await_confirmation(
        &self,
        reference: &TransactionRef,
    ) -> Result<ConfirmationStatus, ChainError>;

    /// Look up a candidate by id.
    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<Candidate, ChainError>;

    /// Find an existing vote transaction from `address` for `candidate_id`,
    /// if the ledger already has one.
    async fn find_vote(
        &self,
        address: &VoterAddress,
        candidate_id: CandidateId,
    ) -> Result<Option<TransactionRef>, ChainError>;
}
