//! LMDB implementation of VoteStore.
//!
//! Records are keyed by the raw 32-byte identity key and bincode-encoded.
//! Every mutating operation performs its read-check and write inside a
//! single LMDB write transaction; LMDB serializes writers, so the
//! check-and-insert in `reserve` is atomic under concurrent callers.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use votum_store::{ReserveOutcome, StoreError, VoteRecord, VoteStore};
use votum_types::{CandidateId, IdentityKey, Timestamp, TransactionRef, VoteStatus, VoterAddress};

use crate::LmdbError;

pub struct LmdbVoteStore {
    pub(crate) env: Arc<Env>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
}

impl LmdbVoteStore {
    fn get_in_txn(
        &self,
        txn: &RwTxn<'_>,
        identity_key: &IdentityKey,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let bytes = self
            .votes_db
            .get(txn, identity_key.as_bytes())
            .map_err(LmdbError::from)?;
        match bytes {
            Some(b) => {
                let record = bincode::deserialize(b)
                    .map_err(|e| StoreError::Corruption(format!("vote record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_in_txn(
        &self,
        txn: &mut RwTxn<'_>,
        record: &VoteRecord,
    ) -> Result<(), StoreError> {
        let bytes = bincode::serialize(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.votes_db
            .put(txn, record.identity_key.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Load, mutate, and store a record inside one write transaction.
    fn update<F>(&self, identity_key: &IdentityKey, f: F) -> Result<VoteRecord, StoreError>
    where
        F: FnOnce(&mut VoteRecord) -> Result<(), StoreError>,
    {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = self
            .get_in_txn(&wtxn, identity_key)?
            .ok_or_else(|| StoreError::NotFound(identity_key.to_string()))?;
        f(&mut record)?;
        self.put_in_txn(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(record)
    }
}

impl VoteStore for LmdbVoteStore {
    fn reserve(
        &self,
        identity_key: &IdentityKey,
        candidate_id: CandidateId,
        now: Timestamp,
    ) -> Result<ReserveOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        if let Some(existing) = self.get_in_txn(&wtxn, identity_key)? {
            // Abort the transaction without writing.
            drop(wtxn);
            tracing::debug!(%identity_key, status = %existing.status, "reserve refused");
            return Ok(ReserveOutcome::AlreadyExists(existing.status));
        }

        let record = VoteRecord::reserved(*identity_key, candidate_id, now);
        self.put_in_txn(&mut wtxn, &record)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(%identity_key, %candidate_id, "vote reserved");
        Ok(ReserveOutcome::Reserved)
    }

    fn advance(
        &self,
        identity_key: &IdentityKey,
        status: VoteStatus,
        transaction_ref: Option<&TransactionRef>,
        now: Timestamp,
    ) -> Result<VoteRecord, StoreError> {
        let record = self.update(identity_key, |record| {
            if record.status == VoteStatus::Confirmed && status == VoteStatus::Confirmed {
                // Repeated confirmation events are no-ops.
                return Ok(());
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
            Ok(())
        })?;

        tracing::debug!(%identity_key, status = %record.status, "vote record advanced");
        Ok(record)
    }

    fn record_attempt(
        &self,
        identity_key: &IdentityKey,
        now: Timestamp,
    ) -> Result<u32, StoreError> {
        let record = self.update(identity_key, |record| {
            record.attempts += 1;
            record.updated_at = now;
            Ok(())
        })?;
        Ok(record.attempts)
    }

    fn record_address(
        &self,
        identity_key: &IdentityKey,
        address: &VoterAddress,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        self.update(identity_key, |record| {
            record.voter_address = Some(address.clone());
            record.updated_at = now;
            Ok(())
        })?;
        Ok(())
    }

    fn record_failure_reason(
        &self,
        identity_key: &IdentityKey,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        self.update(identity_key, |record| {
            record.failure_reason = Some(reason.to_string());
            record.updated_at = now;
            Ok(())
        })?;
        Ok(())
    }

    fn get(&self, identity_key: &IdentityKey) -> Result<Option<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .votes_db
            .get(&rtxn, identity_key.as_bytes())
            .map_err(LmdbError::from)?;
        match bytes {
            Some(b) => {
                let record = bincode::deserialize(b)
                    .map_err(|e| StoreError::Corruption(format!("vote record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn iter_by_status(&self, status: VoteStatus) -> Result<Vec<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.votes_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            let record: VoteRecord = bincode::deserialize(val)
                .map_err(|e| StoreError::Corruption(format!("vote record: {e}")))?;
            if record.status == status {
                results.push(record);
            }
        }
        Ok(results)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.votes_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_store() -> (tempfile::TempDir, LmdbVoteStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).expect("open env");
        let store = env.vote_store();
        (dir, store)
    }

    fn key(seed: u8) -> IdentityKey {
        IdentityKey::new([seed; 32])
    }

    #[test]
    fn reserve_then_duplicate() {
        let (_dir, store) = temp_store();
        let k = key(1);

        let first = store
            .reserve(&k, CandidateId::new(7), Timestamp::new(100))
            .unwrap();
        assert_eq!(first, ReserveOutcome::Reserved);

        let second = store
            .reserve(&k, CandidateId::new(9), Timestamp::new(101))
            .unwrap();
        assert_eq!(
            second,
            ReserveOutcome::AlreadyExists(VoteStatus::Reserved)
        );

        // The original reservation is untouched.
        let record = store.get(&k).unwrap().unwrap();
        assert_eq!(record.candidate_id, CandidateId::new(7));
        assert_eq!(record.reserved_at, Timestamp::new(100));
    }

    #[test]
    fn advance_happy_path_persists() {
        let (_dir, store) = temp_store();
        let k = key(2);
        store
            .reserve(&k, CandidateId::new(7), Timestamp::new(100))
            .unwrap();

        let tx = TransactionRef::new("tx123");
        store
            .advance(&k, VoteStatus::Submitted, Some(&tx), Timestamp::new(101))
            .unwrap();
        let record = store
            .advance(&k, VoteStatus::Confirmed, None, Timestamp::new(102))
            .unwrap();

        assert_eq!(record.status, VoteStatus::Confirmed);
        assert_eq!(record.transaction_ref, Some(tx));
        assert_eq!(record.updated_at, Timestamp::new(102));
    }

    #[test]
    fn confirmed_is_never_overwritten() {
        let (_dir, store) = temp_store();
        let k = key(3);
        store
            .reserve(&k, CandidateId::new(7), Timestamp::new(100))
            .unwrap();
        store
            .advance(
                &k,
                VoteStatus::Submitted,
                Some(&TransactionRef::new("tx1")),
                Timestamp::new(101),
            )
            .unwrap();
        store
            .advance(&k, VoteStatus::Confirmed, None, Timestamp::new(102))
            .unwrap();

        // Repeated confirmation is a no-op, not an error.
        let again = store
            .advance(&k, VoteStatus::Confirmed, None, Timestamp::new(103))
            .unwrap();
        assert_eq!(again.updated_at, Timestamp::new(102));

        // Moving out of Confirmed is an invariant violation.
        let err = store
            .advance(&k, VoteStatus::Failed, None, Timestamp::new(104))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[test]
    fn submitted_reentry_allowed_for_retries() {
        let (_dir, store) = temp_store();
        let k = key(4);
        store
            .reserve(&k, CandidateId::new(7), Timestamp::new(100))
            .unwrap();
        store
            .advance(&k, VoteStatus::Submitted, None, Timestamp::new(101))
            .unwrap();
        store
            .advance(
                &k,
                VoteStatus::Submitted,
                Some(&TransactionRef::new("tx2")),
                Timestamp::new(102),
            )
            .unwrap();

        assert_eq!(store.record_attempt(&k, Timestamp::new(103)).unwrap(), 1);
        assert_eq!(store.record_attempt(&k, Timestamp::new(104)).unwrap(), 2);
    }

    #[test]
    fn backward_transition_rejected() {
        let (_dir, store) = temp_store();
        let k = key(5);
        store
            .reserve(&k, CandidateId::new(7), Timestamp::new(100))
            .unwrap();
        store
            .advance(&k, VoteStatus::Submitted, None, Timestamp::new(101))
            .unwrap();

        let err = store
            .advance(&k, VoteStatus::Reserved, None, Timestamp::new(102))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: VoteStatus::Submitted,
                to: VoteStatus::Reserved,
            }
        ));
    }

    #[test]
    fn iter_by_status_filters() {
        let (_dir, store) = temp_store();
        store
            .reserve(&key(6), CandidateId::new(1), Timestamp::new(100))
            .unwrap();
        store
            .reserve(&key(7), CandidateId::new(2), Timestamp::new(100))
            .unwrap();
        store
            .advance(&key(7), VoteStatus::Submitted, None, Timestamp::new(101))
            .unwrap();

        let reserved = store.iter_by_status(VoteStatus::Reserved).unwrap();
        assert_eq!(reserved.len(), 1);
        assert_eq!(reserved[0].identity_key, key(6));

        let submitted = store.iter_by_status(VoteStatus::Submitted).unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(store.record_count().unwrap(), 2);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let k = key(8);
        {
            let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).unwrap();
            env.vote_store()
                .reserve(&k, CandidateId::new(7), Timestamp::new(100))
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).unwrap();
        let record = env.vote_store().get(&k).unwrap().unwrap();
        assert_eq!(record.status, VoteStatus::Reserved);
        assert_eq!(record.candidate_id, CandidateId::new(7));
    }

    #[test]
    fn concurrent_reserves_single_winner() {
        let (_dir, store) = temp_store();
        let store = std::sync::Arc::new(store);
        let k = key(9);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store.reserve(&k, CandidateId::new(i), Timestamp::new(100))
                })
            })
            .collect();

        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        let winners = outcomes
            .iter()
            .filter(|o| **o == ReserveOutcome::Reserved)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.record_count().unwrap(), 1);
    }
}
