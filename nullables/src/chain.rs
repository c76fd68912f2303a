//! Nullable ledger — scripted submissions and confirmations.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use votum_chain::{Candidate, ChainError, ConfirmationStatus, LedgerClient};
use votum_types::{CandidateId, TransactionRef, VoterAddress};
use votum_wallet::Authorization;

/// Scripted behavior for one `submit` call.
#[derive(Clone, Debug)]
pub enum SubmitOutcome {
    /// The transaction lands and the client learns its reference.
    Accept,
    /// The transaction lands on the ledger, but the client sees a transient
    /// error — the unknown-outcome case a reconciling caller must handle by
    /// querying before resubmitting.
    AcceptUnobserved,
    /// Nothing lands; the client sees a transient error.
    Transient(String),
    /// The ledger definitively rejects the transaction.
    Reject(String),
}

struct SubmittedVote {
    address: VoterAddress,
    candidate_id: CandidateId,
    reference: TransactionRef,
}

struct Inner {
    candidates: HashMap<CandidateId, Candidate>,
    submit_script: VecDeque<SubmitOutcome>,
    /// Scripted confirmation observations per reference; an exhausted or
    /// missing queue reports `Confirmed` for a transaction the ledger has.
    confirm_script: HashMap<TransactionRef, VecDeque<ConfirmationStatus>>,
    submitted: Vec<SubmittedVote>,
    next_ref: u64,
    submit_calls: u32,
    find_vote_calls: u32,
}

/// An in-memory ledger double.
pub struct NullLedger {
    inner: Mutex<Inner>,
}

/// Record a transaction as landed and return its reference.
fn land(
    inner: &mut Inner,
    authorization: &Authorization,
    candidate_id: CandidateId,
) -> TransactionRef {
    let reference = TransactionRef::new(format!("tx{}", inner.next_ref));
    inner.next_ref += 1;
    inner.submitted.push(SubmittedVote {
        address: authorization.address.clone(),
        candidate_id,
        reference: reference.clone(),
    });
    if let Some(candidate) = inner.candidates.get_mut(&candidate_id) {
        candidate.vote_count += 1;
    }
    reference
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                candidates: HashMap::new(),
                submit_script: VecDeque::new(),
                confirm_script: HashMap::new(),
                submitted: Vec::new(),
                next_ref: 123,
                submit_calls: 0,
                find_vote_calls: 0,
            }),
        }
    }

    /// Register a candidate the ledger knows about.
    pub fn add_candidate(&self, id: u64, name: impl Into<String>) {
        let id = CandidateId::new(id);
        self.inner.lock().unwrap().candidates.insert(
            id,
            Candidate {
                id,
                name: name.into(),
                vote_count: 0,
            },
        );
    }

    /// Script the outcome of the next `submit` call. With an empty script,
    /// submissions are accepted.
    pub fn push_submit(&self, outcome: SubmitOutcome) {
        self.inner.lock().unwrap().submit_script.push_back(outcome);
    }

    /// Script confirmation observations for a reference, in order.
    pub fn push_confirmation(&self, reference: &TransactionRef, status: ConfirmationStatus) {
        self.inner
            .lock()
            .unwrap()
            .confirm_script
            .entry(reference.clone())
            .or_default()
            .push_back(status);
    }

    pub fn submit_calls(&self) -> u32 {
        self.inner.lock().unwrap().submit_calls
    }

    pub fn find_vote_calls(&self) -> u32 {
        self.inner.lock().unwrap().find_vote_calls
    }

    /// Number of transactions that actually landed on the ledger.
    pub fn landed_votes(&self) -> usize {
        self.inner.lock().unwrap().submitted.len()
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn submit(
        &self,
        candidate_id: CandidateId,
        authorization: &Authorization,
    ) -> Result<TransactionRef, ChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.submit_calls += 1;

        if !inner.candidates.contains_key(&candidate_id) {
            return Err(ChainError::Rejected(format!(
                "unknown candidate {candidate_id}"
            )));
        }

        let outcome = inner
            .submit_script
            .pop_front()
            .unwrap_or(SubmitOutcome::Accept);

        match outcome {
            SubmitOutcome::Accept => {
                let reference = land(&mut inner, authorization, candidate_id);
                Ok(reference)
            }
            SubmitOutcome::AcceptUnobserved => {
                land(&mut inner, authorization, candidate_id);
                Err(ChainError::TransientSubmit(
                    "connection dropped before receipt".into(),
                ))
            }
            SubmitOutcome::Transient(reason) => Err(ChainError::TransientSubmit(reason)),
            SubmitOutcome::Reject(reason) => Err(ChainError::Rejected(reason)),
        }
    }

    async fn await_confirmation(
        &self,
        reference: &TransactionRef,
    ) -> Result<ConfirmationStatus, ChainError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(queue) = inner.confirm_script.get_mut(reference) {
            if let Some(status) = queue.pop_front() {
                return Ok(status);
            }
        }
        let landed = inner.submitted.iter().any(|s| &s.reference == reference);
        if landed {
            Ok(ConfirmationStatus::Confirmed)
        } else {
            Ok(ConfirmationStatus::Failed {
                reason: "unknown transaction".into(),
            })
        }
    }

    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<Candidate, ChainError> {
        self.inner
            .lock()
            .unwrap()
            .candidates
            .get(&candidate_id)
            .cloned()
            .ok_or(ChainError::UnknownCandidate(candidate_id))
    }

    async fn find_vote(
        &self,
        address: &VoterAddress,
        candidate_id: CandidateId,
    ) -> Result<Option<TransactionRef>, ChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.find_vote_calls += 1;
        Ok(inner
            .submitted
            .iter()
            .find(|s| &s.address == address && s.candidate_id == candidate_id)
            .map(|s| s.reference.clone()))
    }
}
