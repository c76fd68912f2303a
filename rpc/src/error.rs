//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use votum_session::SessionError;
use votum_verifier::VerifierError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("session expired")]
    Gone,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Gone => StatusCode::GONE,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<SessionError> for RpcError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::UnknownSession(id) => RpcError::NotFound(format!("session {id}")),
            SessionError::UnknownCandidate(id) => RpcError::NotFound(format!("candidate {id}")),
            SessionError::Expired => RpcError::Gone,
            SessionError::WrongState { .. } | SessionError::DuplicateVote(_) => {
                RpcError::Conflict(e.to_string())
            }
            SessionError::VerificationFailed { .. } | SessionError::AuthorizationFailed(_) => {
                RpcError::Forbidden(e.to_string())
            }
            SessionError::Verifier(VerifierError::InvalidSample(reason)) => {
                RpcError::InvalidRequest(format!("invalid sample: {reason}"))
            }
            SessionError::Verifier(_)
            | SessionError::Chain(_)
            | SessionError::SubmissionFailed(_) => RpcError::Upstream(e.to_string()),
            SessionError::InvalidTransition { .. }
            | SessionError::Store(_)
            | SessionError::Config(_) => RpcError::Server(e.to_string()),
        }
    }
}
