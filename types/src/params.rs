//! Tunable parameters of the vote pipeline.
//!
//! All values can be loaded from the service's TOML configuration; the
//! defaults are the intended production configuration.

use serde::{Deserialize, Serialize};

/// Parameters governing verification, session expiry, and submission retry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteParams {
    /// Minimum biometric similarity, in [0, 1], for a capture to count as
    /// verified. The comparison is inclusive: a score equal to the threshold
    /// verifies.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Duration of a voting session before it expires.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Maximum biometric captures per session before the session fails
    /// terminally.
    #[serde(default = "default_max_verify_attempts")]
    pub max_verify_attempts: u32,

    /// Maximum ledger submission attempts per reserved vote.
    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,

    /// Total timeout for one identity-verifier call (milliseconds).
    #[serde(default = "default_verifier_timeout_ms")]
    pub verifier_timeout_ms: u64,

    /// Hard cap on waiting for ledger confirmation of one submission
    /// (milliseconds).
    #[serde(default = "default_ledger_confirmation_timeout_ms")]
    pub ledger_confirmation_timeout_ms: u64,

    /// Interval between confirmation polls (milliseconds).
    #[serde(default = "default_confirmation_poll_interval_ms")]
    pub confirmation_poll_interval_ms: u64,

    /// Initial delay before the first submission retry (milliseconds).
    #[serde(default = "default_submit_backoff_initial_ms")]
    pub submit_backoff_initial_ms: u64,

    /// Ceiling for the exponential submission backoff (milliseconds).
    #[serde(default = "default_submit_backoff_max_ms")]
    pub submit_backoff_max_ms: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_session_timeout_secs() -> u64 {
    300
}

fn default_max_verify_attempts() -> u32 {
    3
}

fn default_max_submit_attempts() -> u32 {
    5
}

fn default_verifier_timeout_ms() -> u64 {
    10_000
}

fn default_ledger_confirmation_timeout_ms() -> u64 {
    60_000
}

fn default_confirmation_poll_interval_ms() -> u64 {
    500
}

fn default_submit_backoff_initial_ms() -> u64 {
    1_000
}

fn default_submit_backoff_max_ms() -> u64 {
    60_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl VoteParams {
    /// Defaults with near-zero delays, for tests that drive the pipeline
    /// through many retries without waiting on wall-clock backoff.
    pub fn fast_defaults() -> Self {
        Self {
            confirmation_poll_interval_ms: 1,
            submit_backoff_initial_ms: 1,
            submit_backoff_max_ms: 4,
            ledger_confirmation_timeout_ms: 50,
            verifier_timeout_ms: 50,
            ..Self::default()
        }
    }
}

impl Default for VoteParams {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            session_timeout_secs: default_session_timeout_secs(),
            max_verify_attempts: default_max_verify_attempts(),
            max_submit_attempts: default_max_submit_attempts(),
            verifier_timeout_ms: default_verifier_timeout_ms(),
            ledger_confirmation_timeout_ms: default_ledger_confirmation_timeout_ms(),
            confirmation_poll_interval_ms: default_confirmation_poll_interval_ms(),
            submit_backoff_initial_ms: default_submit_backoff_initial_ms(),
            submit_backoff_max_ms: default_submit_backoff_max_ms(),
        }
    }
}
