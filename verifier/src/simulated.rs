//! Simulated identity verifier.
//!
//! Deterministic local matcher for demos and tests: an in-memory enrollment
//! table maps claimed identities to enrollment names, enrolled identities
//! match at a fixed score and unknown identities miss at another. No model,
//! no network — the same trait contract as the real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use votum_types::Timestamp;

use crate::{BiometricSample, IdentityVerifier, VerificationResult, VerifierError};

/// Similarity granted to an enrolled identity.
const MATCH_SCORE: f64 = 0.95;
/// Similarity granted to an unknown identity.
const MISS_SCORE: f64 = 0.40;

pub struct SimulatedVerifier {
    enrollments: Mutex<HashMap<String, String>>,
    threshold: f64,
    match_score: f64,
}

impl SimulatedVerifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            enrollments: Mutex::new(HashMap::new()),
            threshold,
            match_score: MATCH_SCORE,
        }
    }

    /// Enroll a claimed identity under an enrollment name.
    pub fn enroll(&self, claimed_identity: impl Into<String>, name: impl Into<String>) {
        self.enrollments
            .lock()
            .unwrap()
            .insert(claimed_identity.into(), name.into());
    }

    /// Override the score enrolled identities match at.
    pub fn set_match_score(&mut self, score: f64) {
        self.match_score = score;
    }
}

#[async_trait]
impl IdentityVerifier for SimulatedVerifier {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn verify(
        &self,
        claimed_identity: &str,
        sample: &BiometricSample,
    ) -> Result<VerificationResult, VerifierError> {
        // Samples go through the same validation as the real backend's.
        debug_assert!(!sample.as_bytes().is_empty());

        let matched = self
            .enrollments
            .lock()
            .unwrap()
            .get(claimed_identity)
            .cloned();

        let (name, similarity) = match matched {
            Some(name) => (name, self.match_score),
            None => (String::new(), MISS_SCORE),
        };

        Ok(VerificationResult::evaluate(
            claimed_identity,
            &name,
            similarity,
            None,
            false,
            self.threshold,
            Timestamp::now(),
        ))
    }
}
