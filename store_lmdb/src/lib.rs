//! LMDB storage backend for the votum idempotency ledger.
//!
//! Implements the storage traits from `votum-store` using the `heed` LMDB
//! bindings. The vote ledger maps to a single named database within one
//! environment; LMDB's serialized write transactions are what make
//! `reserve` an atomic check-and-insert.

pub mod environment;
pub mod error;
pub mod votes;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use votes::LmdbVoteStore;
