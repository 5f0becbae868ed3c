use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use super::{
    REQUEST_ID_HEADER, SEQSCORE_STATUS_COMPLETE, SEQSCORE_STATUS_HEADER, SEQSCORE_STATUS_PARTIAL,
};
use crate::batch::ScoreRequest;
use crate::constants::MAX_TOP_LOGPROBS;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;

#[instrument(skip(state, request), fields(request_id = tracing::field::Empty))]
pub async fn score_handler(
    State(state): State<HandlerState>,
    Json(request): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", tracing::field::display(&request_id));

    let request: ScoreRequest = serde_json::from_value(request)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))?;
    validate_score_request(&request, &state)?;

    debug!(
        candidates = request.candidates.len(),
        mode = %request.scoring.mode,
        top_logprobs = request.return_top_logprobs,
        "Scoring request accepted"
    );

    let batch = state.orchestrator.score_batch(request).await;

    let status = if batch.is_complete() {
        SEQSCORE_STATUS_COMPLETE
    } else {
        SEQSCORE_STATUS_PARTIAL
    };
    info!(
        results = batch.results.len(),
        failed = batch.failed_count(),
        status,
        "Score request finished"
    );

    let mut headers = HeaderMap::new();
    headers.insert(SEQSCORE_STATUS_HEADER, HeaderValue::from_static(status));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    Ok((StatusCode::OK, headers, Json(batch)).into_response())
}

pub(crate) fn validate_score_request(
    request: &ScoreRequest,
    state: &HandlerState,
) -> Result<(), GatewayError> {
    if request.candidates.len() > state.max_candidates {
        return Err(GatewayError::InvalidRequest(format!(
            "Too many candidates: {} (limit {})",
            request.candidates.len(),
            state.max_candidates
        )));
    }

    if request.return_top_logprobs > MAX_TOP_LOGPROBS {
        return Err(GatewayError::InvalidRequest(format!(
            "`return_top_logprobs` must be between 0 and {}",
            MAX_TOP_LOGPROBS
        )));
    }

    let mut seen = HashSet::with_capacity(request.candidates.len());
    for candidate in &request.candidates {
        if candidate.id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "Candidate `id` must not be empty".to_string(),
            ));
        }
        if !seen.insert(candidate.id.as_str()) {
            return Err(GatewayError::InvalidRequest(format!(
                "Duplicate candidate id: `{}`",
                candidate.id
            )));
        }
        if state.orchestrator.selector().resolve_model(candidate).is_none() {
            return Err(GatewayError::InvalidRequest(format!(
                "Candidate `{}` has no `model_for_scoring` and no default model is configured",
                candidate.id
            )));
        }
    }

    Ok(())
}
