//! Abstract storage traits for the votum idempotency ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! The idempotency ledger is the single source of truth for "has this
//! identity already voted"; its `reserve` operation is the one place in the
//! service where correctness depends on true mutual exclusion.

pub mod error;
pub mod record;
pub mod votes;

pub use error::StoreError;
pub use record::VoteRecord;
pub use votes::{ReserveOutcome, VoteStore};
