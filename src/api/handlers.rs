//! HTTP request handlers

use super::types::{
    ErrorResponse, ResetResponse, SendMessageRequest, SendMessageResponse, SessionResponse,
    SuccessResponse,
};
use super::AppState;
use crate::runtime::TurnError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

const GENERATION_FAILED_MESSAGE: &str = "Could not get a response, please try again.";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/reset", post(reset_session))
        .route("/api/messages", post(send_message))
        .route("/api/cancel", post(cancel_turn))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Session
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.session.lock();
    Json(SessionResponse {
        id: session.id(),
        created_at: session.created_at(),
        state: session.state().name(),
        model: state.orchestrator.model_id().to_string(),
        turns: session.transcript().snapshot().to_vec(),
    })
}

async fn reset_session(State(state): State<AppState>) -> Json<ResetResponse> {
    Json(ResetResponse {
        id: state.session.reset(),
    })
}

// ============================================================
// Turns
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let reply = state
        .orchestrator
        .handle_user_message(&state.session, &req.text)
        .await?;

    Ok(Json(SendMessageResponse {
        reply,
        turns: state.session.snapshot(),
    }))
}

async fn cancel_turn(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.session.cancel();
    Json(SuccessResponse { ok: true })
}

async fn get_version() -> &'static str {
    concat!("gemini-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    BadGateway { detail: String },
}

impl From<TurnError> for AppError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Validation(e) => AppError::BadRequest(e.to_string()),
            TurnError::Busy | TurnError::Abandoned => AppError::Conflict(err.to_string()),
            TurnError::Generation(e) => AppError::BadGateway { detail: e.message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::BadGateway { detail } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(GENERATION_FAILED_MESSAGE).with_detail(detail),
            ),
        };

        (status, Json(body)).into_response()
    }
}
