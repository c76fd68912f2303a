//! HTTP bridge to a wallet-connect service.
//!
//! The bridge fronts whatever wallet the voter uses; this client only
//! understands the bridge's JSON contract: POST `{session_id}`, respond
//! either `{address, signature}` or `{error: {code, message}}`. Error code
//! 4001 is a user rejection (the EIP-1193 convention the original wallet
//! flow used); everything else from the provider is treated as transient.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use votum_types::{SessionId, Timestamp, VoterAddress};

use crate::{Authorization, AuthorizationProvider, WalletError};

/// Provider error code for "the user declined the prompt".
const CODE_USER_REJECTED: i64 = 4001;

pub struct HttpAuthorizationProvider {
    http: reqwest::Client,
    authorize_url: String,
}

#[derive(Deserialize)]
struct AuthorizeResponse {
    address: Option<String>,
    signature: Option<String>,
    error: Option<ProviderError>,
}

#[derive(Deserialize)]
struct ProviderError {
    code: i64,
    message: String,
}

impl HttpAuthorizationProvider {
    /// Create a provider client for the given bridge base URL.
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        let base = base_url.into();
        Ok(Self {
            http,
            authorize_url: format!("{}/authorize", base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl AuthorizationProvider for HttpAuthorizationProvider {
    async fn authorize(&self, session_id: SessionId) -> Result<Authorization, WalletError> {
        let body = serde_json::json!({ "session_id": session_id.to_string() });

        let response = self
            .http
            .post(&self.authorize_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WalletError::Unavailable("wallet prompt timed out".into())
                } else {
                    WalletError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(WalletError::Unavailable(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let parsed: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Protocol(format!("invalid JSON response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(match err.code {
                CODE_USER_REJECTED => WalletError::UserRejected,
                _ if err.message.contains("No accounts") => WalletError::NoAccounts,
                _ => WalletError::Unavailable(format!(
                    "provider error {}: {}",
                    err.code, err.message
                )),
            });
        }

        let address = parsed
            .address
            .filter(|a| !a.is_empty())
            .ok_or(WalletError::NoAccounts)?;
        let signature = parsed
            .signature
            .ok_or_else(|| WalletError::Protocol("response missing signature".into()))?;

        tracing::debug!(%session_id, address = %address, "authorization granted");

        Ok(Authorization {
            address: VoterAddress::new(address),
            signature_or_handle: signature,
            granted_at: Timestamp::now(),
        })
    }
}
