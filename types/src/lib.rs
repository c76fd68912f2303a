//! Fundamental types for the votum voting service.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: identifiers, timestamps, vote statuses, and tunable parameters.

pub mod address;
pub mod candidate;
pub mod identity;
pub mod params;
pub mod session;
pub mod state;
pub mod time;
pub mod transaction;

pub use address::VoterAddress;
pub use candidate::CandidateId;
pub use identity::IdentityKey;
pub use params::VoteParams;
pub use session::SessionId;
pub use state::VoteStatus;
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{TransactionRecord, TransactionRef};
