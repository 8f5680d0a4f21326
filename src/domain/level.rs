// Level definitions handed over by the level-loaded signal.

use super::state::Visibility;
use super::zone::{EnemyStats, ZoneShape};
use glam::Vec2;

#[derive(Debug, Clone)]
pub enum ZoneTemplate {
    Pickup {
        value: i32,
    },
    Hazard,
    Enemy {
        stats: EnemyStats,
        path: Vec<Vec2>,
    },
    Bullet {
        value: i32,
        direction: Vec2,
        velocity: f32,
        /// Seconds until the bullet is removed.
        lifespan: f32,
        /// Seconds until the bullet starts moving.
        start_delay: f32,
    },
}

#[derive(Debug, Clone)]
pub struct ZoneDefinition {
    pub template: ZoneTemplate,
    pub position: Vec2,
    pub shape: ZoneShape,
}

#[derive(Debug, Clone)]
pub struct LevelDefinition {
    pub visibility: Visibility,
    /// Life at level start; falls back to the sphere tuning.
    pub life: Option<u32>,
    /// How many spawn points to lay out for joins without a position.
    pub expected_players: usize,
    pub zones: Vec<ZoneDefinition>,
}

impl Default for LevelDefinition {
    fn default() -> Self {
        Self {
            visibility: Visibility::Visible,
            life: None,
            expected_players: 2,
            zones: Vec::new(),
        }
    }
}
