//! HTTP client for an external biometric matching service.
//!
//! The service exposes a single JSON endpoint: POST `{image_base64,
//! claimed_identity}`, respond `{name, distance, similarity, verified}` with
//! similarity as a percentage. The remote `verified` flag is advisory only —
//! this client normalizes similarity to [0, 1] and applies its own
//! configured threshold, so one number decides everywhere.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use votum_types::Timestamp;

use crate::{BiometricSample, IdentityVerifier, VerificationResult, VerifierError};

/// Identity verifier backed by a remote matching service.
pub struct HttpVerifier {
    http: reqwest::Client,
    verify_url: String,
    threshold: f64,
}

#[derive(Deserialize)]
struct VerifyResponse {
    /// Best-matching enrollment name; absent when nothing matched.
    name: Option<String>,
    /// Raw model distance for the best match.
    distance: Option<f64>,
    /// Similarity as a percentage in [0, 100].
    #[serde(default)]
    similarity: f64,
    /// Whether the service flagged the capture as non-live.
    #[serde(default)]
    liveness_failed: bool,
}

impl HttpVerifier {
    /// Create a verifier client for the given base URL (e.g.
    /// `http://127.0.0.1:8000`).
    pub fn new(
        base_url: impl Into<String>,
        threshold: f64,
        timeout_ms: u64,
    ) -> Result<Self, VerifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(10_000)))
            .build()
            .map_err(|e| VerifierError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        let base = base_url.into();
        Ok(Self {
            http,
            verify_url: format!("{}/verify-base64", base.trim_end_matches('/')),
            threshold,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpVerifier {
    fn name(&self) -> &str {
        "http"
    }

    async fn verify(
        &self,
        claimed_identity: &str,
        sample: &BiometricSample,
    ) -> Result<VerificationResult, VerifierError> {
        let body = serde_json::json!({
            "image_base64": sample.to_base64(),
            "claimed_identity": claimed_identity,
        });

        let response = self
            .http
            .post(&self.verify_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifierError::Unavailable("verifier request timed out".into())
                } else {
                    VerifierError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            if detail.contains("No registered faces") {
                return Err(VerifierError::NoEnrolledFaces);
            }
            return Err(VerifierError::InvalidSample(format!(
                "verifier rejected capture: HTTP {status}: {detail}"
            )));
        }
        if !status.is_success() {
            return Err(VerifierError::Unavailable(format!(
                "verifier returned HTTP {status}"
            )));
        }

        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| VerifierError::Protocol(format!("invalid JSON response: {e}")))?;

        // The service reports similarity in percent.
        let similarity = (parsed.similarity / 100.0).clamp(0.0, 1.0);
        let matched_name = parsed.name.unwrap_or_default();

        let result = VerificationResult::evaluate(
            claimed_identity,
            &matched_name,
            similarity,
            parsed.distance,
            parsed.liveness_failed,
            self.threshold,
            Timestamp::now(),
        );

        tracing::debug!(
            claimed_identity,
            matched = %result.matched_name,
            similarity = result.similarity,
            verified = result.verified,
            "biometric match evaluated"
        );

        Ok(result)
    }
}
