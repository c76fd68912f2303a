//! Axum-based HTTP server.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use votum_session::SessionOrchestrator;

use crate::error::RpcError;
use crate::handlers;

/// Shared state for all handlers.
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

/// Build the API router.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health))
        .route("/v1/session", post(handlers::start_session))
        .route("/v1/session/:id", get(handlers::get_session))
        .route("/v1/session/:id/sample", post(handlers::submit_sample))
        .route("/v1/session/:id/authorize", post(handlers::authorize))
        .route("/v1/session/:id/vote", post(handlers::cast_vote))
        .route("/v1/candidate/:id", get(handlers::get_candidate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub addr: String,
    pub port: u16,
}

impl RpcServer {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
        }
    }

    /// Start the server and run until the shutdown signal fires.
    pub async fn start(
        &self,
        state: Arc<AppState>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RpcError> {
        let router = routes(state);
        let listener = tokio::net::TcpListener::bind((self.addr.as_str(), self.port))
            .await
            .map_err(|e| RpcError::Server(format!("bind {}:{}: {e}", self.addr, self.port)))?;

        tracing::info!(addr = %self.addr, port = self.port, "RPC server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("RPC server shutting down");
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use votum_nullables::{MemoryVoteStore, NullAuthorizer, NullLedger, NullVerifier};
    use votum_types::VoteParams;

    fn test_state() -> (Arc<AppState>, Arc<NullVerifier>, Arc<NullLedger>) {
        let params = VoteParams::fast_defaults();
        let verifier = Arc::new(NullVerifier::new(params.similarity_threshold));
        let wallet = Arc::new(NullAuthorizer::default());
        let ledger = Arc::new(NullLedger::new());
        ledger.add_candidate(7, "Ada");
        let store = Arc::new(MemoryVoteStore::new());

        let orchestrator = Arc::new(SessionOrchestrator::new(
            verifier.clone(),
            wallet,
            ledger.clone(),
            store,
            params,
        ));
        (Arc::new(AppState { orchestrator }), verifier, ledger)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (state, _, _) = test_state();
        let response = routes(state)
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let (state, verifier, _) = test_state();
        verifier.push_score("alice", 0.9);
        let app = routes(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/session",
                serde_json::json!({ "claimed_identity": "V1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["state"], "capturing");
        let id = session["session_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/v1/session/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"], "capturing");
    }

    #[tokio::test]
    async fn malformed_session_id_is_bad_request() {
        let (state, _, _) = test_state();
        let response = routes(state)
            .oneshot(
                Request::get("/v1/session/not-hex")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (state, _, _) = test_state();
        let response = routes(state)
            .oneshot(
                Request::get(format!("/v1/session/{}", "00".repeat(16)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn garbage_capture_is_bad_request() {
        let (state, _, _) = test_state();
        let app = routes(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/session",
                serde_json::json!({ "claimed_identity": "V1" }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(post_json(
                &format!("/v1/session/{id}/sample"),
                serde_json::json!({ "image_base64": "!!not-base64!!" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_candidate_is_not_found() {
        let (state, _, _) = test_state();
        let response = routes(state)
            .oneshot(
                Request::get("/v1/candidate/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn candidate_lookup_proxies_the_ledger() {
        let (state, _, _) = test_state();
        let response = routes(state)
            .oneshot(Request::get("/v1/candidate/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["vote_count"], 0);
    }
}
