//! Request handlers and their wire types.
//!
//! Responses never echo authorization material — the UI gets the granted
//! address and the transaction reference, not signatures.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use votum_session::VotingSession;
use votum_types::{CandidateId, SessionId};
use votum_verifier::BiometricSample;

use crate::error::RpcError;
use crate::server::AppState;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub claimed_identity: String,
}

#[derive(Deserialize)]
pub struct SubmitSampleRequest {
    pub image_base64: String,
}

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub candidate_id: u64,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: String,
    pub claimed_identity: String,
    pub verify_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub expires_at: u64,
}

impl From<VotingSession> for SessionResponse {
    fn from(session: VotingSession) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            state: session.state.to_string(),
            claimed_identity: session.claimed_identity,
            verify_attempts: session.verify_attempts,
            similarity: session.verification.as_ref().map(|v| v.similarity),
            address: session
                .authorization
                .as_ref()
                .map(|a| a.address.to_string()),
            transaction_ref: session
                .transaction
                .as_ref()
                .map(|t| t.reference.to_string()),
            confirmed_at: session
                .transaction
                .as_ref()
                .and_then(|t| t.confirmed_at)
                .map(|t| t.as_secs()),
            failure_reason: session.failure_reason,
            expires_at: session.expires_at.as_secs(),
        }
    }
}

#[derive(Serialize)]
pub struct CandidateResponse {
    pub id: u64,
    pub name: String,
    pub vote_count: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ── Handlers ─────────────────────────────────────────────────────────────

fn parse_session_id(raw: &str) -> Result<SessionId, RpcError> {
    raw.parse()
        .map_err(|_| RpcError::InvalidRequest(format!("malformed session id '{raw}'")))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>, RpcError> {
    let session = state
        .orchestrator
        .start_session(&req.claimed_identity)
        .await?;
    Ok(Json(session.into()))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let id = parse_session_id(&id)?;
    let session = state.orchestrator.session(id).await?;
    Ok(Json(session.into()))
}

pub async fn submit_sample(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitSampleRequest>,
) -> Result<Json<SessionResponse>, RpcError> {
    let id = parse_session_id(&id)?;
    let sample = BiometricSample::from_base64(&req.image_base64)
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let session = state.orchestrator.submit_sample(id, &sample).await?;
    Ok(Json(session.into()))
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, RpcError> {
    let id = parse_session_id(&id)?;
    let session = state.orchestrator.authorize(id).await?;
    Ok(Json(session.into()))
}

pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Json<SessionResponse>, RpcError> {
    let id = parse_session_id(&id)?;
    let session = state
        .orchestrator
        .cast_vote(id, CandidateId::new(req.candidate_id))
        .await?;
    Ok(Json(session.into()))
}

pub async fn get_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<CandidateResponse>, RpcError> {
    let candidate = state.orchestrator.candidate(CandidateId::new(id)).await?;
    Ok(Json(CandidateResponse {
        id: candidate.id.as_u64(),
        name: candidate.name,
        vote_count: candidate.vote_count,
    }))
}
