// Lobby orchestration for spawning and managing session worlds.

use crate::domain::tuning::{PlayerTuning, SphereTuning};
use crate::domain::{LevelDefinition, SessionContext, SessionEvent};
use crate::use_cases::game::world_task;
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound player input events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Capacity for broadcast session events.
    pub event_broadcast_capacity: usize,
    /// Fixed tick interval for the session loop.
    pub tick_interval: Duration,
    pub sphere_tuning: SphereTuning,
    pub player_tuning: PlayerTuning,
}

/// Errors returned by lobby registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum LobbyError {
    /// Lobby already exists and cannot be re-created.
    AlreadyExists,
    NotFound,
    /// Pinned lobbies live for the whole process.
    Pinned,
}

#[derive(Debug)]
struct PlayerConn {
    token: u64,
    shutdown: Arc<Notify>,
}

/// Per-lobby channels and connection ownership.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Identifier clients use to target this lobby.
    pub lobby_id: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Broadcast sender for session events raised by the world task.
    pub events_tx: broadcast::Sender<SessionEvent>,
    /// Broadcast sender for serialized session events.
    pub events_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender for high-level server state changes.
    pub server_state_tx: watch::Sender<ServerState>,
    pub pinned: bool,
    shutdown: Arc<Notify>,
    player_conns: Arc<Mutex<HashMap<u64, PlayerConn>>>,
}

impl LobbyHandle {
    /// Claims the player slot for a new connection and returns the signal that
    /// fires when a newer connection replaces it.
    pub async fn register_or_replace_player_connection(
        &self,
        player_id: u64,
        token: u64,
    ) -> Arc<Notify> {
        let shutdown = Arc::new(Notify::new());
        let previous = self.player_conns.lock().await.insert(
            player_id,
            PlayerConn {
                token,
                shutdown: shutdown.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.shutdown.notify_one();
        }
        shutdown
    }

    /// Releases the player slot only if `token` still owns it.
    ///
    /// Returns true when the slot was released, i.e. no newer connection took over.
    pub async fn unregister_player_connection_if_owner(&self, player_id: u64, token: u64) -> bool {
        let mut conns = self.player_conns.lock().await;
        match conns.get(&player_id) {
            Some(conn) if conn.token == token => {
                conns.remove(&player_id);
                true
            }
            _ => false,
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.player_conns.lock().await.len()
    }

    async fn close(&self) {
        self.shutdown.notify_one();
        let conns = self.player_conns.lock().await;
        for conn in conns.values() {
            conn.shutdown.notify_one();
        }
    }
}

/// Thread-safe registry for active lobbies.
#[derive(Debug)]
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    /// Map of lobby id to active handle.
    lobbies: RwLock<HashMap<String, LobbyHandle>>,
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("lobby_id", &self.lobby_id)
            .field("pinned", &self.pinned)
            .finish_non_exhaustive()
    }
}

impl LobbyRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new lobby playing `level` and spawns its world task.
    pub async fn create_lobby(
        &self,
        lobby_id: String,
        level: LevelDefinition,
        pinned: bool,
    ) -> Result<LobbyHandle, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists);
        }

        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (events_tx, _events_rx) =
            broadcast::channel::<SessionEvent>(self.settings.event_broadcast_capacity);
        let (events_bytes_tx, _events_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.event_broadcast_capacity);
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        let session = SessionContext::new(
            self.settings.sphere_tuning,
            self.settings.player_tuning,
            level,
        );

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(world_task(
            input_rx,
            world_tx.clone(),
            events_tx.clone(),
            server_state_tx.clone(),
            self.settings.tick_interval,
            shutdown.clone(),
            session,
        ));

        let lobby = LobbyHandle {
            lobby_id: Arc::from(lobby_id.clone()),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            events_tx,
            events_bytes_tx,
            server_state_tx,
            pinned,
            shutdown,
            player_conns: Arc::new(Mutex::new(HashMap::new())),
        };

        info!(lobby_id = %lobby_id, pinned, "lobby created");
        lobbies.insert(lobby_id, lobby.clone());
        Ok(lobby)
    }

    /// Returns a lobby handle for the provided id, if it exists.
    pub async fn get_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_id).cloned()
    }

    /// Stops the lobby's world task and disconnects its clients.
    pub async fn remove_lobby(&self, lobby_id: &str) -> Result<(), LobbyError> {
        let lobby = {
            let mut lobbies = self.lobbies.write().await;
            match lobbies.get(lobby_id) {
                None => return Err(LobbyError::NotFound),
                Some(lobby) if lobby.pinned => return Err(LobbyError::Pinned),
                Some(_) => {}
            }
            lobbies.remove(lobby_id)
        };

        if let Some(lobby) = lobby {
            lobby.close().await;
            info!(lobby_id, "lobby removed");
        }
        Ok(())
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LobbyRegistry {
        LobbyRegistry::new(LobbySettings {
            input_channel_capacity: 8,
            world_broadcast_capacity: 8,
            event_broadcast_capacity: 8,
            tick_interval: Duration::from_millis(10),
            sphere_tuning: SphereTuning::default(),
            player_tuning: PlayerTuning::default(),
        })
    }

    #[tokio::test]
    async fn when_lobby_id_is_reused_then_creation_fails() {
        let registry = registry();
        registry
            .create_lobby("a".into(), LevelDefinition::default(), false)
            .await
            .unwrap();

        let again = registry
            .create_lobby("a".into(), LevelDefinition::default(), false)
            .await;

        assert_eq!(again.err(), Some(LobbyError::AlreadyExists));
    }

    #[tokio::test]
    async fn when_lobby_is_pinned_then_it_cannot_be_removed() {
        let registry = registry();
        registry
            .create_lobby("pinned".into(), LevelDefinition::default(), true)
            .await
            .unwrap();
        registry
            .create_lobby("temp".into(), LevelDefinition::default(), false)
            .await
            .unwrap();

        assert_eq!(registry.remove_lobby("pinned").await, Err(LobbyError::Pinned));
        assert_eq!(registry.remove_lobby("temp").await, Ok(()));
        assert_eq!(registry.remove_lobby("temp").await, Err(LobbyError::NotFound));
        assert_eq!(registry.lobby_count().await, 1);
    }

    #[tokio::test]
    async fn when_player_reconnects_then_the_old_connection_is_signalled() {
        let registry = registry();
        let lobby = registry
            .create_lobby("a".into(), LevelDefinition::default(), false)
            .await
            .unwrap();

        let first = lobby.register_or_replace_player_connection(7, 1).await;
        let _second = lobby.register_or_replace_player_connection(7, 2).await;

        tokio::time::timeout(Duration::from_secs(1), first.notified())
            .await
            .expect("old connection should be told to close");
        assert!(!lobby.unregister_player_connection_if_owner(7, 1).await);
        assert!(lobby.unregister_player_connection_if_owner(7, 2).await);
        assert_eq!(lobby.connection_count().await, 0);
    }
}
