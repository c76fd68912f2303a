//! Vote session orchestration.
//!
//! One [`VotingSession`] per voter attempt, driven through a forward-only
//! state machine: capture → verify → authorize → reserve → submit → confirm.
//! The orchestrator owns retry and backoff policy for every external
//! collaborator; the idempotency ledger's atomic `reserve` is the single
//! chokepoint that makes double voting impossible no matter how many
//! concurrent sessions or UI retries exist for the same identity.

pub mod backoff;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod reconcile;
pub mod shutdown;
pub mod state;

pub use backoff::RetrySchedule;
pub use config::ServiceConfig;
pub use error::SessionError;
pub use events::SessionEvent;
pub use orchestrator::SessionOrchestrator;
pub use reconcile::{ReconcileReport, Reconciler};
pub use shutdown::ShutdownController;
pub use state::{SessionState, VotingSession};
