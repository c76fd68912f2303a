use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier unavailable: {0}")]
    Unavailable(String),

    #[error("invalid biometric sample: {0}")]
    InvalidSample(String),

    #[error("verifier has no enrolled faces to match against")]
    NoEnrolledFaces,

    #[error("malformed verifier response: {0}")]
    Protocol(String),
}

impl VerifierError {
    /// Whether a fresh attempt with the same session may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
