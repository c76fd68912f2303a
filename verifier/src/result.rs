//! The outcome of one biometric verification.

use serde::{Deserialize, Serialize};
use votum_types::{IdentityKey, Timestamp};

/// The immutable result of matching one capture against an enrollment.
///
/// A new capture produces a new result; results are never updated in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Deduplication key derived from the claimed identity and the matched
    /// enrollment name.
    pub identity_key: IdentityKey,
    /// Enrollment name the backend matched against.
    pub matched_name: String,
    /// Match confidence in [0, 1].
    pub similarity: f64,
    /// Raw model distance, when the backend reports one.
    pub distance: Option<f64>,
    /// Whether the capture verifies: similarity at or above the threshold
    /// (inclusive) and no liveness failure.
    pub verified: bool,
    /// When the capture was evaluated.
    pub captured_at: Timestamp,
}

impl VerificationResult {
    /// Evaluate a match against the configured threshold.
    ///
    /// The boundary case is inclusive: `similarity == threshold` verifies.
    pub fn evaluate(
        claimed_identity: &str,
        matched_name: &str,
        similarity: f64,
        distance: Option<f64>,
        liveness_failed: bool,
        threshold: f64,
        captured_at: Timestamp,
    ) -> Self {
        let verified = !liveness_failed && similarity >= threshold;
        Self {
            identity_key: IdentityKey::derive(claimed_identity, matched_name),
            matched_name: matched_name.to_string(),
            similarity,
            distance,
            verified,
            captured_at,
        }
    }
}
