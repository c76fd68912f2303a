//! Ledger transaction reference and per-submission record.

use crate::candidate::CandidateId;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger-assigned identifier of a submitted vote transaction (e.g. a hash).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionRef(String);

impl TransactionRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the service knows about one vote transaction on the external ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Ledger-assigned reference.
    pub reference: TransactionRef,
    /// Candidate the transaction votes for.
    pub candidate_id: CandidateId,
    /// When the transaction was handed to the ledger.
    pub submitted_at: Timestamp,
    /// When finality was observed, if it has been.
    pub confirmed_at: Option<Timestamp>,
    /// Ledger-reported failure reason, if the transaction failed.
    pub failure_reason: Option<String>,
}

impl TransactionRecord {
    pub fn submitted(reference: TransactionRef, candidate_id: CandidateId, at: Timestamp) -> Self {
        Self {
            reference,
            candidate_id,
            submitted_at: at,
            confirmed_at: None,
            failure_reason: None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}
