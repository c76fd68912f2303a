//! Vote record storage trait.

use crate::record::VoteRecord;
use crate::StoreError;
use votum_types::{CandidateId, IdentityKey, Timestamp, TransactionRef, VoteStatus, VoterAddress};

/// Result of an atomic reservation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// No record existed; a `Reserved` row was inserted.
    Reserved,
    /// A record already exists for this identity, in the given status.
    AlreadyExists(VoteStatus),
}

/// Trait for storing vote records, keyed by identity.
///
/// `reserve` is the sole synchronization point of the whole service:
/// implementations must make the check-and-insert atomic under concurrent
/// calls for the same key (a write transaction, a unique constraint, or a
/// single lock).
pub trait VoteStore: Send + Sync {
    /// Atomically insert a `Reserved` record for `identity_key` unless one
    /// already exists.
    fn reserve(
        &self,
        identity_key: &IdentityKey,
        candidate_id: CandidateId,
        now: Timestamp,
    ) -> Result<ReserveOutcome, StoreError>;

    /// Advance a record's status, recording the transaction reference when
    /// one is supplied.
    ///
    /// Transitions must be monotonic (`Reserved → Submitted → Confirmed`, or
    /// `→ Failed` from any non-terminal status). `Confirmed → Confirmed` is
    /// an idempotent no-op; `Submitted → Submitted` is permitted so a retry
    /// can reuse the reserved row. Anything else fails with
    /// [`StoreError::InvalidTransition`].
    fn advance(
        &self,
        identity_key: &IdentityKey,
        status: VoteStatus,
        transaction_ref: Option<&TransactionRef>,
        now: Timestamp,
    ) -> Result<VoteRecord, StoreError>;

    /// Increment the submission attempt counter.
    fn record_attempt(&self, identity_key: &IdentityKey, now: Timestamp)
        -> Result<u32, StoreError>;

    /// Record the authorized voter address on a record, before submission.
    fn record_address(
        &self,
        identity_key: &IdentityKey,
        address: &VoterAddress,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Record the ledger failure reason on a record (typically alongside an
    /// `advance` to `Failed`).
    fn record_failure_reason(
        &self,
        identity_key: &IdentityKey,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Look up the record for an identity, if any.
    fn get(&self, identity_key: &IdentityKey) -> Result<Option<VoteRecord>, StoreError>;

    /// All records currently in the given status, for reconciliation and
    /// operator tooling.
    fn iter_by_status(&self, status: VoteStatus) -> Result<Vec<VoteRecord>, StoreError>;

    /// Total number of records.
    fn record_count(&self) -> Result<u64, StoreError>;
}
