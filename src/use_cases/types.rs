// Use-case level inputs/outputs for the session loop.

use crate::domain::{LevelDefinition, PlayerSnapshot, SphereSnapshot, ZoneSnapshot};
use glam::Vec2;

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        player_id: u64,
        mass: Option<f32>,
        position: Option<Vec2>,
    },
    Leave {
        player_id: u64,
    },
    Position {
        player_id: u64,
        position: Vec2,
    },
    SetMass {
        player_id: u64,
        mass: f32,
    },
    Pause,
    Resume,
    LoadLevel(Box<LevelDefinition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Lobby,
    LevelRunning,
    Paused,
    LevelFailed,
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub sphere: SphereSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub zones: Vec<ZoneSnapshot>,
    pub score: i32,
    pub life: u32,
    pub critical: bool,
}
