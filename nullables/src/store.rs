//! Nullable store — thread-safe in-memory vote records for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use votum_store::{ReserveOutcome, StoreError, VoteRecord, VoteStore};
use votum_types::{CandidateId, IdentityKey, Timestamp, TransactionRef, VoteStatus, VoterAddress};

/// An in-memory vote store.
///
/// A single `Mutex` over the record map is the atomicity primitive: the
/// check-and-insert in `reserve` happens entirely under the lock, matching
/// the guarantee the LMDB backend gets from serialized write transactions.
pub struct MemoryVoteStore {
    records: Mutex<HashMap<IdentityKey, VoteRecord>>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteStore for MemoryVoteStore {
    fn reserve(
        &self,
        identity_key: &IdentityKey,
        candidate_id: CandidateId,
        now: Timestamp,
    ) -> Result<ReserveOutcome, StoreError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(identity_key) {
            return Ok(ReserveOutcome::AlreadyExists(existing.status));
        }
        records.insert(
            *identity_key,
            VoteRecord::reserved(*identity_key, candidate_id, now),
        );
        Ok(ReserveOutcome::Reserved)
    }

    fn advance(
        &self,
        identity_key: &IdentityKey,
        status: VoteStatus,
        transaction_ref: Option<&TransactionRef>,
        now: Timestamp,
    ) -> Result<VoteRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(identity_key)
            .ok_or_else(|| StoreError::NotFound(identity_key.to_string()))?;

        if record.status == VoteStatus::Confirmed && status == VoteStatus::Confirmed {
            return Ok(record.clone());
        }
        if !record.status.can_advance_to(status) {
            return Err(StoreError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        if let Some(tx_ref) = transaction_ref {
            record.transaction_ref = Some(tx_ref.clone());
        }
        record.updated_at = now;
        Ok(record.clone())
    }

    fn record_attempt(
        &self,
        identity_key: &IdentityKey,
        now: Timestamp,
    ) -> Result<u32, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(identity_key)
            .ok_or_else(|| StoreError::NotFound(identity_key.to_string()))?;
        record.attempts += 1;
        record.updated_at = now;
        Ok(record.attempts)
    }

    fn record_address(
        &self,
        identity_key: &IdentityKey,
        address: &VoterAddress,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(identity_key)
            .ok_or_else(|| StoreError::NotFound(identity_key.to_string()))?;
        record.voter_address = Some(address.clone());
        record.updated_at = now;
        Ok(())
    }

    fn record_failure_reason(
        &self,
        identity_key: &IdentityKey,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(identity_key)
            .ok_or_else(|| StoreError::NotFound(identity_key.to_string()))?;
        record.failure_reason = Some(reason.to_string());
        record.updated_at = now;
        Ok(())
    }

    fn get(&self, identity_key: &IdentityKey) -> Result<Option<VoteRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(identity_key).cloned())
    }

    fn iter_by_status(&self, status: VoteStatus) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> IdentityKey {
        IdentityKey::new([seed; 32])
    }

    #[test]
    fn reserve_is_first_writer_wins() {
        let store = MemoryVoteStore::new();
        let k = key(1);
        assert_eq!(
            store
                .reserve(&k, CandidateId::new(1), Timestamp::new(10))
                .unwrap(),
            ReserveOutcome::Reserved
        );
        assert_eq!(
            store
                .reserve(&k, CandidateId::new(2), Timestamp::new(11))
                .unwrap(),
            ReserveOutcome::AlreadyExists(VoteStatus::Reserved)
        );
    }

    #[test]
    fn advance_mirrors_lmdb_semantics() {
        let store = MemoryVoteStore::new();
        let k = key(2);
        store
            .reserve(&k, CandidateId::new(1), Timestamp::new(10))
            .unwrap();
        store
            .advance(&k, VoteStatus::Submitted, None, Timestamp::new(11))
            .unwrap();
        store
            .advance(&k, VoteStatus::Confirmed, None, Timestamp::new(12))
            .unwrap();
        let err = store
            .advance(&k, VoteStatus::Submitted, None, Timestamp::new(13))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }
}
