// Interaction zones: level geometry the sphere can touch.

use super::path::EnemyPath;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneShape {
    Circle { radius: f32 },
    Rect { half_width: f32, half_height: f32 },
}

impl ZoneShape {
    /// Whether a circle at `center` with `radius` overlaps this shape placed at `origin`.
    pub fn overlaps_circle(&self, origin: Vec2, center: Vec2, radius: f32) -> bool {
        match *self {
            ZoneShape::Circle { radius: r } => {
                let reach = r + radius;
                origin.distance_squared(center) <= reach * reach
            }
            ZoneShape::Rect {
                half_width,
                half_height,
            } => {
                let half = Vec2::new(half_width, half_height);
                let closest = center.clamp(origin - half, origin + half);
                closest.distance_squared(center) <= radius * radius
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementType {
    /// Constant speed towards the next waypoint.
    Linear,
    /// Interpolated by fraction of the journey covered.
    Lerp,
    /// Jump to the next waypoint once `speed` seconds have passed.
    Teleport,
    /// Chase the sphere directly.
    Follow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    /// Units per second, or the teleport cooldown in seconds.
    pub speed: f32,
    pub movement_type: MovementType,
    pub destroyed_on_hit: bool,
    pub blink_duration: f32,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            speed: 1.0,
            movement_type: MovementType::Linear,
            destroyed_on_hit: false,
            blink_duration: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ZoneKind {
    Pickup {
        value: i32,
    },
    Hazard {
        damage: u32,
    },
    Enemy {
        stats: EnemyStats,
        path: EnemyPath,
        blinking: bool,
    },
    Bullet {
        value: i32,
        direction: Vec2,
        velocity: f32,
        armed: bool,
    },
}

/// Which effects a zone responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub enter: bool,
    pub stay: bool,
    pub exit: bool,
}

impl ZoneKind {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            ZoneKind::Hazard { .. } => Capabilities {
                enter: true,
                stay: true,
                exit: true,
            },
            ZoneKind::Pickup { .. } | ZoneKind::Enemy { .. } | ZoneKind::Bullet { .. } => {
                Capabilities {
                    enter: true,
                    stay: false,
                    exit: false,
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZoneKind::Pickup { .. } => "pickup",
            ZoneKind::Hazard { .. } => "hazard",
            ZoneKind::Enemy { .. } => "enemy",
            ZoneKind::Bullet { .. } => "bullet",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionZone {
    pub id: u64,
    pub kind: ZoneKind,
    pub position: Vec2,
    pub shape: ZoneShape,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct ZoneSnapshot {
    pub id: u64,
    pub kind: &'static str,
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl From<&InteractionZone> for ZoneSnapshot {
    fn from(z: &InteractionZone) -> Self {
        Self {
            id: z.id,
            kind: z.kind.name(),
            x: z.position.x,
            y: z.position.y,
            active: z.active,
        }
    }
}
