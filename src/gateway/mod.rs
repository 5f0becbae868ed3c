//! HTTP gateway (Axum) for candidate scoring.
//!
//! This module is primarily used by the `seqscore` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::score_handler;
pub use state::HandlerState;

/// Response header summarising the outcome of a request.
pub const SEQSCORE_STATUS_HEADER: &str = "x-seqscore-status";
/// Response header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const SEQSCORE_STATUS_HEALTHY: &str = "healthy";
/// Every candidate was scored.
pub const SEQSCORE_STATUS_COMPLETE: &str = "complete";
/// At least one candidate carries an error.
pub const SEQSCORE_STATUS_PARTIAL: &str = "partial";

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/score", post(score_handler))
        .route("/v1/score", post(score_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        SEQSCORE_STATUS_HEADER,
        HeaderValue::from_static(SEQSCORE_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}
