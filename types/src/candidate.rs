//! Candidate identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque integer id of a candidate on the external ledger.
///
/// The ledger contract takes candidate ids as plain integers; the service
/// validates them against the candidate registry before reserving a vote but
/// attaches no other meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(u64);

impl CandidateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CandidateId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
