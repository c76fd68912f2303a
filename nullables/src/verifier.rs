//! Nullable identity verifier — scripted match outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use votum_types::Timestamp;
use votum_verifier::{BiometricSample, IdentityVerifier, VerificationResult, VerifierError};

/// One scripted verifier response.
enum Scripted {
    /// Match against `name` at `similarity`.
    Score { name: String, similarity: f64 },
    /// Fail the call with this error.
    Error(VerifierError),
}

/// A verifier that replays a script of outcomes in order.
///
/// An exhausted script fails loudly (`Unavailable`) rather than inventing a
/// result, so tests that under-script are caught immediately.
pub struct NullVerifier {
    threshold: f64,
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicU32,
}

impl NullVerifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Script the next call to match `name` at `similarity`.
    pub fn push_score(&self, name: impl Into<String>, similarity: f64) {
        self.script.lock().unwrap().push_back(Scripted::Score {
            name: name.into(),
            similarity,
        });
    }

    /// Script the next call to fail.
    pub fn push_error(&self, error: VerifierError) {
        self.script.lock().unwrap().push_back(Scripted::Error(error));
    }

    /// How many times `verify` has been called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for NullVerifier {
    fn name(&self) -> &str {
        "null"
    }

    async fn verify(
        &self,
        claimed_identity: &str,
        _sample: &BiometricSample,
    ) -> Result<VerificationResult, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Score { name, similarity }) => Ok(VerificationResult::evaluate(
                claimed_identity,
                &name,
                similarity,
                None,
                false,
                self.threshold,
                Timestamp::new(0),
            )),
            Some(Scripted::Error(e)) => Err(e),
            None => Err(VerifierError::Unavailable("verifier script exhausted".into())),
        }
    }
}
