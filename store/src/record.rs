//! The vote record — one row per identity key.

use serde::{Deserialize, Serialize};
use votum_types::{CandidateId, IdentityKey, Timestamp, TransactionRef, VoteStatus, VoterAddress};

/// One identity's claim on its single vote.
///
/// There is at most one record per [`IdentityKey`]; the record is created by
/// `reserve` and only ever advanced forward through [`VoteStatus`]. A
/// `Confirmed` record is never overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Primary key — unique per enrolled voter.
    pub identity_key: IdentityKey,
    /// Candidate the vote was reserved for.
    pub candidate_id: CandidateId,
    /// Current position in the reserve/submit/confirm pipeline.
    pub status: VoteStatus,
    /// Ledger-assigned transaction reference, once known.
    pub transaction_ref: Option<TransactionRef>,
    /// Account the vote was authorized from. Recorded before submission so
    /// a reconciliation pass can query the ledger for an existing
    /// transaction even after a crash.
    pub voter_address: Option<VoterAddress>,
    /// Number of ledger submission attempts made for this record.
    pub attempts: u32,
    /// Ledger-reported reason, set when `status` is `Failed`.
    pub failure_reason: Option<String>,
    /// When the reservation was created.
    pub reserved_at: Timestamp,
    /// When the record last changed.
    pub updated_at: Timestamp,
}

impl VoteRecord {
    /// A fresh reservation with no submission attempts.
    pub fn reserved(identity_key: IdentityKey, candidate_id: CandidateId, now: Timestamp) -> Self {
        Self {
            identity_key,
            candidate_id,
            status: VoteStatus::Reserved,
            transaction_ref: None,
            voter_address: None,
            attempts: 0,
            failure_reason: None,
            reserved_at: now,
            updated_at: now,
        }
    }
}
