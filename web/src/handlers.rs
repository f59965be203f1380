//! HTTP handlers for the game API.
//!
//! Failures surface as JSON `{"error": ...}` bodies with 4xx statuses and
//! never mutate the session they were aimed at.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::{GameSession, SessionError};
use crate::types::{
    BoardArrayResponse, ErrorBody, GameStateResponse, MoveRequest, MoveResponse, MovesResponse,
    NewGameRequest,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn session_error(err: SessionError) -> ApiError {
    let status = match err {
        SessionError::IllegalMove(_) | SessionError::Parse(_) => StatusCode::BAD_REQUEST,
        SessionError::GameOver | SessionError::NoAi(_) => StatusCode::CONFLICT,
    };
    error(status, err.to_string())
}

fn not_found(id: &str) -> ApiError {
    error(StatusCode::NOT_FOUND, format!("no session {id}"))
}

pub async fn new_game(
    State(state): State<Arc<AppState>>,
    request: Option<Json<NewGameRequest>>,
) -> Result<Json<GameStateResponse>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let id = Uuid::new_v4().to_string();
    let session = GameSession::new(id.clone(), request.black, request.white, &state.network);
    let response = session.to_response();

    state.sessions.lock().await.insert(id.clone(), session);
    info!(
        session = %id,
        black = request.black.name(),
        white = request.white.name(),
        "session created"
    );
    Ok(Json(response))
}

pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GameStateResponse>, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(session.to_response()))
}

pub async fn legal_moves(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MovesResponse>, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(MovesResponse {
        moves: session.legal_literals(),
    }))
}

pub async fn play_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;

    let mv = session
        .apply_literal(&request.mv)
        .map_err(session_error)?;
    debug!(session = %id, mv = %contrast_core::codec::format_move(&mv), "move applied");

    Ok(Json(MoveResponse {
        applied: contrast_core::codec::format_move(&mv),
        state: session.to_response(),
    }))
}

pub async fn ai_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MoveResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;

    let mv = session.ai_move().map_err(session_error)?;
    debug!(session = %id, mv = %contrast_core::codec::format_move(&mv), "ai move applied");

    Ok(Json(MoveResponse {
        applied: contrast_core::codec::format_move(&mv),
        state: session.to_response(),
    }))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GameStateResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    session.reset();
    Ok(Json(session.to_response()))
}

pub async fn board_text(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<String, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(session.board_text())
}

pub async fn board_array(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BoardArrayResponse>, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(BoardArrayResponse {
        array: session.board_array(),
        to_move: match session.state().to_move {
            contrast_core::Player::White => "white".into(),
            _ => "black".into(),
        },
    }))
}
