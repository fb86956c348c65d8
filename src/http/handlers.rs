use super::messages::{ChatRequest, ChatResponse};
use super::state::AppState;
use crate::error::RelayError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};

/// Response header telling full completions apart from closed or timed-out
/// partial replies.
pub const TURN_COMPLETION_HEADER: &str = "x-turn-completion";

/// POST /api/chat
/// Relay one conversational turn and reply with the aggregated result
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection.body_text());
            return RelayError::BadRequest(rejection.body_text()).into_response();
        }
    };

    let input = match request.into_turn_input() {
        Ok(input) => input,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return e.into_response();
        }
    };

    match state.relay.relay_turn(input).await {
        Ok(reply) => {
            let completion = reply.completion.as_str();
            info!(
                completion,
                text_len = reply.text.len(),
                audio_bytes = reply.audio.len(),
                "Sending chat response"
            );
            (
                StatusCode::OK,
                [(TURN_COMPLETION_HEADER, completion)],
                Json(ChatResponse::from(reply)),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Any method other than POST on /api/chat
pub async fn method_not_allowed(method: Method) -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        format!("Method {} Not Allowed", method),
    )
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
