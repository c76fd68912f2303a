//! Identity verification clients.
//!
//! The service does not specify HOW a voter's presence is proven — only THAT
//! a capture was matched against an enrolled identity. The
//! [`IdentityVerifier`] trait is the single contract; implementations are
//! selected by configuration:
//!
//! - [`HttpVerifier`] — calls an external biometric matching service.
//! - [`SimulatedVerifier`] — deterministic local matcher for demos and tests.

pub mod error;
pub mod http;
pub mod result;
pub mod sample;
pub mod simulated;

pub use error::VerifierError;
pub use http::HttpVerifier;
pub use result::VerificationResult;
pub use sample::BiometricSample;
pub use simulated::SimulatedVerifier;

use async_trait::async_trait;

/// A pluggable identity verifier.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Human-readable name of this verifier backend.
    fn name(&self) -> &str;

    /// Match a captured sample against the enrollment for
    /// `claimed_identity`.
    ///
    /// Returns a fully populated [`VerificationResult`] or an error — never
    /// a partial result. Implementations must bound their own latency; a
    /// timed-out backend surfaces as [`VerifierError::Unavailable`].
    async fn verify(
        &self,
        claimed_identity: &str,
        sample: &BiometricSample,
    ) -> Result<VerificationResult, VerifierError>;
}
