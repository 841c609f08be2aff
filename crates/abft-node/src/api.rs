//! The HTTP surface (spec.md §6): adapts `abft-core`'s framework-free
//! control surface (§4.4) to five `axum` routes plus a `/metrics` endpoint,
//! the way `guts-node::api` adapts `guts-core`/`guts-storage` to routes
//! with an `AppState` shared across handlers.

use crate::error::ApiError;
use crate::observability::{metrics_handler, NodeMetrics};
use abft_core::{Node, RawMsgPayload, Status};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// State shared across every handler: the node itself and its metrics.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
    pub metrics: Arc<NodeMetrics>,
}

/// Builds the router described by spec.md §6's route table.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/message", post(message))
        .route("/start", get(start))
        .route("/stop", get(stop))
        .route("/getState", get(get_state))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /status`: 200 "live" unless faulty, else 500 "faulty".
async fn status(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.node.handle_status() {
        Status::Live => (StatusCode::OK, "live"),
        Status::Faulty => (StatusCode::INTERNAL_SERVER_ERROR, "faulty"),
    }
}

/// `POST /message`: validates and tallies, 400 on malformed input.
async fn message(
    State(state): State<AppState>,
    Json(raw): Json<RawMsgPayload>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let phase = raw.phase.clone();
    state.node.handle_message(raw)?;
    if let Some(phase) = phase.and_then(|p| match p.as_str() {
        "R" => Some(abft_core::Phase::R),
        "P" => Some(abft_core::Phase::P),
        _ => None,
    }) {
        state.metrics.record_message_ingested(phase);
    }
    Ok((StatusCode::OK, "Message received"))
}

/// `GET /start`: arms the engine, 500 if faulty or killed.
async fn start(State(state): State<AppState>) -> Result<(StatusCode, &'static str), ApiError> {
    state.node.handle_start()?;
    Ok((StatusCode::OK, "Consensus started"))
}

/// `GET /stop`: disarms the engine and kills the node. Always succeeds.
async fn stop(State(state): State<AppState>) -> (StatusCode, &'static str) {
    state.node.handle_stop();
    (StatusCode::OK, "Consensus stopped")
}

/// `GET /getState`: the three-branch snapshot (spec.md §6).
async fn get_state(State(state): State<AppState>) -> Json<abft_core::GetStateResponse> {
    Json(state.node.handle_get_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use abft_core::{Broadcaster, InMemoryBroadcaster, Params, Readiness, Value};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(params: Params) -> Router {
        let broadcaster: Arc<dyn Broadcaster> = Arc::new(InMemoryBroadcaster::new(0, vec![]));
        let node = Arc::new(Node::new(params, broadcaster, Readiness::always_ready()));
        let metrics = Arc::new(NodeMetrics::new(params.node_id));
        create_router(AppState { node, metrics })
    }

    fn params(is_faulty: bool) -> Params {
        Params {
            n: 3,
            f: 0,
            node_id: 0,
            initial_value: Value::Zero,
            is_faulty,
        }
    }

    #[tokio::test]
    async fn status_live_and_faulty() {
        let resp = app(params(false))
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app(params(true))
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn message_accepts_well_formed_and_rejects_malformed() {
        let router = app(params(false));

        let good = router
            .clone()
            .oneshot(
                Request::post("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"R","round":1,"val":1,"sender":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(good.status(), StatusCode::OK);

        let bad = router
            .oneshot(
                Request::post("/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"round":1,"val":1,"sender":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_rejected_when_faulty() {
        let resp = app(params(true))
            .oneshot(Request::get("/start").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn stop_always_succeeds() {
        let resp = app(params(false))
            .oneshot(Request::get("/stop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_state_reflects_boot_snapshot() {
        let resp = app(params(false))
            .oneshot(Request::get("/getState").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["x"], 0);
        assert_eq!(json["decided"], false);
        assert_eq!(json["k"], 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let resp = app(params(false))
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
