use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_lobby_serializers;
use crate::interface_adapters::protocol::LevelDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, LobbyError};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct LobbyInitRequest {
    // Lobby id chosen by the caller.
    lobby_id: String,
    // Level the lobby starts on; an empty level when omitted.
    #[serde(default)]
    level: LevelDto,
}

#[derive(Debug, serde::Serialize)]
struct LobbyInitResponse {
    // The lobby id that was created.
    lobby_id: String,
}

fn error_response(status: StatusCode, error: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub async fn create_lobby_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LobbyInitRequest>,
) -> impl IntoResponse {
    let lobby_id = payload.lobby_id.trim().to_string();
    if lobby_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "lobby_id is required");
    }

    // Created lobbies are not pinned and can be deleted again.
    match state
        .lobby_registry
        .create_lobby(lobby_id.clone(), payload.level.into(), false)
        .await
    {
        Ok(lobby) => {
            // Create serializers so clients can subscribe immediately.
            spawn_lobby_serializers(&lobby);
            (StatusCode::CREATED, Json(LobbyInitResponse { lobby_id })).into_response()
        }
        Err(LobbyError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "lobby already exists")
        }
        Err(e) => {
            tracing::error!(lobby_id = %lobby_id, error = ?e, "unexpected lobby create error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lobby create failed")
        }
    }
}

pub async fn delete_lobby_handler(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<String>,
) -> impl IntoResponse {
    match state.lobby_registry.remove_lobby(&lobby_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(LobbyError::NotFound) => error_response(StatusCode::NOT_FOUND, "lobby not found"),
        Err(LobbyError::Pinned) => error_response(StatusCode::CONFLICT, "lobby is pinned"),
        Err(LobbyError::AlreadyExists) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lobby delete failed")
        }
    }
}

/// Swaps the level a lobby is running. This is also how a failed level restarts.
pub async fn load_level_handler(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<String>,
    Json(level): Json<LevelDto>,
) -> impl IntoResponse {
    let Some(lobby) = state.lobby_registry.get_lobby(&lobby_id).await else {
        return error_response(StatusCode::NOT_FOUND, "lobby not found");
    };

    let event = GameEvent::LoadLevel(Box::new(level.into()));
    if lobby.input_tx.send(event).await.is_err() {
        tracing::error!(lobby_id = %lobby_id, "world task closed; level not loaded");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "level load failed");
    }

    tracing::info!(lobby_id = %lobby_id, "level load requested");
    StatusCode::ACCEPTED.into_response()
}
