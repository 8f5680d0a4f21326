// Use cases layer: application workflows for the session server.

pub mod game;
pub mod lobby;
pub mod types;

pub use lobby::{LobbyError, LobbyHandle, LobbyRegistry, LobbySettings};
pub use types::{GameEvent, ServerState, WorldUpdate};
