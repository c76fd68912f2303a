//! HTTP API for the votum service.
//!
//! Provides endpoints for:
//! - Session lifecycle (start, capture, authorize, cast)
//! - Session status snapshots
//! - Candidate lookups (proxied to the ledger)
//! - Health checks
//!
//! CORS is open; one-vote-per-voter is enforced by the idempotency ledger,
//! not by the HTTP layer.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{routes, AppState, RpcServer};
