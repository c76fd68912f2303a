//! JSON-RPC HTTP client for the vote ledger.
//!
//! Wraps `reqwest::Client` with the ledger gateway's base URL. Requests are
//! JSON objects with an `action` field; responses carry either a `result`
//! object or an `error` string, with transient-vs-final classification in
//! the optional `retryable` flag.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use votum_types::{CandidateId, TransactionRef, VoterAddress};
use votum_wallet::Authorization;

use crate::{Candidate, ChainError, ConfirmationStatus, LedgerClient};

pub struct HttpLedgerClient {
    http: reqwest::Client,
    ledger_url: String,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<String>,
    /// Whether a reported error is safe to retry. Defaults to false: an
    /// unclassified ledger error must not be blindly replayed.
    #[serde(default)]
    retryable: bool,
}

#[derive(Deserialize)]
struct SubmitResult {
    #[serde(rename = "ref")]
    reference: String,
}

#[derive(Deserialize)]
struct StatusResult {
    status: String,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateResult {
    id: u64,
    name: String,
    vote_count: u64,
}

#[derive(Deserialize)]
struct FindVoteResult {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

impl HttpLedgerClient {
    /// Create a new client targeting the given gateway URL (e.g.
    /// `http://127.0.0.1:7545`).
    pub fn new(ledger_url: impl Into<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChainError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            ledger_url: ledger_url.into(),
        })
    }

    /// Send one action request and return the `result` field.
    async fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| ChainError::Protocol("params must be a JSON object".into()))?
            .insert("action".to_string(), serde_json::json!(action));

        let response = self
            .http
            .post(&self.ledger_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::TransientSubmit(format!("{action} timed out"))
                } else {
                    ChainError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Unavailable(format!(
                "ledger gateway returned HTTP {}",
                response.status()
            )));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ChainError::Protocol(format!("invalid JSON response: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(if envelope.retryable {
                ChainError::TransientSubmit(err)
            } else {
                ChainError::Rejected(err)
            });
        }

        envelope
            .result
            .ok_or_else(|| ChainError::Protocol("response missing result".into()))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit(
        &self,
        candidate_id: CandidateId,
        authorization: &Authorization,
    ) -> Result<TransactionRef, ChainError> {
        let result = self
            .rpc_call(
                "vote",
                serde_json::json!({
                    "candidate_id": candidate_id.as_u64(),
                    "address": authorization.address.as_str(),
                    "signature": authorization.signature_or_handle,
                }),
            )
            .await?;

        let parsed: SubmitResult = serde_json::from_value(result)
            .map_err(|e| ChainError::Protocol(format!("invalid vote response: {e}")))?;

        tracing::debug!(%candidate_id, reference = %parsed.reference, "vote submitted");
        Ok(TransactionRef::new(parsed.reference))
    }

    async fn await_confirmation(
        &self,
        reference: &TransactionRef,
    ) -> Result<ConfirmationStatus, ChainError> {
        let result = self
            .rpc_call(
                "transaction_status",
                serde_json::json!({ "ref": reference.as_str() }),
            )
            .await?;

        let parsed: StatusResult = serde_json::from_value(result)
            .map_err(|e| ChainError::Protocol(format!("invalid status response: {e}")))?;

        match parsed.status.as_str() {
            "confirmed" => Ok(ConfirmationStatus::Confirmed),
            "pending" => Ok(ConfirmationStatus::Pending),
            "failed" => Ok(ConfirmationStatus::Failed {
                reason: parsed.reason.unwrap_or_else(|| "unspecified".into()),
            }),
            other => Err(ChainError::Protocol(format!(
                "unknown transaction status '{other}'"
            ))),
        }
    }

    async fn get_candidate(&self, candidate_id: CandidateId) -> Result<Candidate, ChainError> {
        let result = self
            .rpc_call(
                "get_candidate",
                serde_json::json!({ "candidate_id": candidate_id.as_u64() }),
            )
            .await;

        let result = match result {
            Err(ChainError::Rejected(reason)) if reason.contains("unknown candidate") => {
                return Err(ChainError::UnknownCandidate(candidate_id));
            }
            other => other?,
        };

        let parsed: CandidateResult = serde_json::from_value(result)
            .map_err(|e| ChainError::Protocol(format!("invalid candidate response: {e}")))?;

        Ok(Candidate {
            id: CandidateId::new(parsed.id),
            name: parsed.name,
            vote_count: parsed.vote_count,
        })
    }

    async fn find_vote(
        &self,
        address: &VoterAddress,
        candidate_id: CandidateId,
    ) -> Result<Option<TransactionRef>, ChainError> {
        let result = self
            .rpc_call(
                "find_vote",
                serde_json::json!({
                    "address": address.as_str(),
                    "candidate_id": candidate_id.as_u64(),
                }),
            )
            .await?;

        let parsed: FindVoteResult = serde_json::from_value(result)
            .map_err(|e| ChainError::Protocol(format!("invalid find_vote response: {e}")))?;

        Ok(parsed.reference.map(TransactionRef::new))
    }
}
