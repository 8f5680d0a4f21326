use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    // Owns every running lobby and its world task.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Lobby used when a client connects without `lobby_id`.
    pub default_lobby_id: Arc<str>,
}
