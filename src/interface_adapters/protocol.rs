// Wire protocol DTOs and conversions for public session server messages.
// Internal HTTP request bodies live next to their handlers.

use crate::domain::{
    EnemyStats, LevelDefinition, MovementType, PlayerSnapshot, SessionEvent, SphereSnapshot,
    Visibility, ZoneDefinition, ZoneShape, ZoneSnapshot, ZoneTemplate,
};
use crate::use_cases::{ServerState, WorldUpdate};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String },
    // Snapshot of the session for a given tick.
    WorldUpdate(WorldUpdateDto),
    // Discrete gameplay notification raised during a tick.
    Event(SessionEventDto),
    // High-level server state transitions.
    GameState(ServerStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake; everything else is rejected until it arrives.
    Join(JoinPayload),
    Position(PointDto),
    SetMass(SetMassDto),
    Pause,
    Resume,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mass: Option<f32>,
    #[serde(default)]
    pub position: Option<PointDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointDto {
    pub x: f32,
    pub y: f32,
}

impl PointDto {
    /// Returns the point only if both coordinates are finite.
    pub fn finite(self) -> Option<Vec2> {
        let point = Vec2::new(self.x, self.y);
        point.is_finite().then_some(point)
    }
}

impl From<PointDto> for Vec2 {
    fn from(p: PointDto) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<Vec2> for PointDto {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetMassDto {
    pub mass: f32,
}

/// Snapshot of the session sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub sphere: SphereStateDto,
    pub players: Vec<PlayerStateDto>,
    pub zones: Vec<ZoneStateDto>,
    pub score: i32,
    pub life: u32,
    pub critical: bool,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            sphere: SphereStateDto::from(&update.sphere),
            players: update.players.iter().map(PlayerStateDto::from).collect(),
            zones: update.zones.iter().map(ZoneStateDto::from).collect(),
            score: update.score,
            life: update.life,
            critical: update.critical,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SphereStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub moved: bool,
    pub invincible: bool,
    pub destroyed: bool,
    pub faded: bool,
}

impl From<&SphereSnapshot> for SphereStateDto {
    fn from(s: &SphereSnapshot) -> Self {
        Self {
            id: s.id.to_string(),
            x: s.x,
            y: s.y,
            vx: s.vx,
            vy: s.vy,
            moved: s.moved,
            invincible: s.invincible,
            destroyed: s.destroyed,
            faded: s.faded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            x: p.x,
            y: p.y,
            mass: p.mass,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneStateDto {
    pub id: String,
    pub kind: &'static str,
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

impl From<&ZoneSnapshot> for ZoneStateDto {
    fn from(z: &ZoneSnapshot) -> Self {
        Self {
            id: z.id.to_string(),
            kind: z.kind,
            x: z.x,
            y: z.y,
            active: z.active,
        }
    }
}

/// Gameplay notifications in wire form, tagged by `kind`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEventDto {
    LevelStarted,
    SpherePositionChanged { x: f32, y: f32 },
    SphereMoved { moved: bool },
    ScoreChanged { score: i32, delta: i32 },
    LifeChanged { life: u32 },
    LifeCritical { critical: bool },
    LivesExhausted,
    SphereDestroyed { sphere_id: String },
    SphereRespawned { sphere_id: String, x: f32, y: f32 },
    SphereBlinked { sphere_id: String },
    SphereDamaged { sphere_id: String },
    SphereFaded { sphere_id: String },
    VisibilityApplied { sphere_id: String },
    PickupCollected { zone_id: String, value: i32 },
    EnemyBlinkStarted { zone_id: String, duration: f32 },
    EnemyBlinkEnded { zone_id: String },
    ZoneRemoved { zone_id: String },
}

impl From<SessionEvent> for SessionEventDto {
    fn from(event: SessionEvent) -> Self {
        use SessionEvent as E;
        match event {
            E::LevelStarted => Self::LevelStarted,
            E::SpherePositionChanged { position } => Self::SpherePositionChanged {
                x: position.x,
                y: position.y,
            },
            E::SphereMoved { moved } => Self::SphereMoved { moved },
            E::ScoreChanged { score, delta } => Self::ScoreChanged { score, delta },
            E::LifeChanged { life } => Self::LifeChanged { life },
            E::LifeCritical { critical } => Self::LifeCritical { critical },
            E::LivesExhausted => Self::LivesExhausted,
            E::SphereDestroyed { sphere_id } => Self::SphereDestroyed {
                sphere_id: sphere_id.to_string(),
            },
            E::SphereRespawned {
                sphere_id,
                position,
            } => Self::SphereRespawned {
                sphere_id: sphere_id.to_string(),
                x: position.x,
                y: position.y,
            },
            E::SphereBlinked { sphere_id } => Self::SphereBlinked {
                sphere_id: sphere_id.to_string(),
            },
            E::SphereDamaged { sphere_id } => Self::SphereDamaged {
                sphere_id: sphere_id.to_string(),
            },
            E::SphereFaded { sphere_id } => Self::SphereFaded {
                sphere_id: sphere_id.to_string(),
            },
            E::VisibilityApplied { sphere_id } => Self::VisibilityApplied {
                sphere_id: sphere_id.to_string(),
            },
            E::PickupCollected { zone_id, value } => Self::PickupCollected {
                zone_id: zone_id.to_string(),
                value,
            },
            E::EnemyBlinkStarted { zone_id, duration } => Self::EnemyBlinkStarted {
                zone_id: zone_id.to_string(),
                duration,
            },
            E::EnemyBlinkEnded { zone_id } => Self::EnemyBlinkEnded {
                zone_id: zone_id.to_string(),
            },
            E::ZoneRemoved { zone_id } => Self::ZoneRemoved {
                zone_id: zone_id.to_string(),
            },
        }
    }
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby,
    LevelRunning,
    Paused,
    LevelFailed,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby => ServerStateDto::Lobby,
            ServerState::LevelRunning => ServerStateDto::LevelRunning,
            ServerState::Paused => ServerStateDto::Paused,
            ServerState::LevelFailed => ServerStateDto::LevelFailed,
        }
    }
}

// Level definitions posted by whoever creates lobbies.

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityDto {
    #[default]
    Visible,
    FadeAfterStart,
    Invisible,
}

impl From<VisibilityDto> for Visibility {
    fn from(v: VisibilityDto) -> Self {
        match v {
            VisibilityDto::Visible => Visibility::Visible,
            VisibilityDto::FadeAfterStart => Visibility::FadeAfterStart,
            VisibilityDto::Invisible => Visibility::Invisible,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDto {
    Circle { radius: f32 },
    Rect { half_width: f32, half_height: f32 },
}

impl Default for ShapeDto {
    fn default() -> Self {
        ShapeDto::Circle { radius: 0.5 }
    }
}

impl From<ShapeDto> for ZoneShape {
    fn from(s: ShapeDto) -> Self {
        match s {
            ShapeDto::Circle { radius } => ZoneShape::Circle { radius },
            ShapeDto::Rect {
                half_width,
                half_height,
            } => ZoneShape::Rect {
                half_width,
                half_height,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDto {
    #[default]
    Linear,
    Lerp,
    Teleport,
    Follow,
}

impl From<MovementDto> for MovementType {
    fn from(m: MovementDto) -> Self {
        match m {
            MovementDto::Linear => MovementType::Linear,
            MovementDto::Lerp => MovementType::Lerp,
            MovementDto::Teleport => MovementType::Teleport,
            MovementDto::Follow => MovementType::Follow,
        }
    }
}

fn default_speed() -> f32 {
    1.0
}

fn default_blink() -> f32 {
    1.0
}

fn default_lifespan() -> f32 {
    5.0
}

fn default_start_delay() -> f32 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneKindDto {
    Pickup {
        value: i32,
    },
    Hazard,
    Enemy {
        #[serde(default = "default_speed")]
        speed: f32,
        #[serde(default)]
        movement: MovementDto,
        #[serde(default)]
        destroyed_on_hit: bool,
        #[serde(default = "default_blink")]
        blink_duration: f32,
        #[serde(default)]
        path: Vec<PointDto>,
    },
    Bullet {
        value: i32,
        direction: PointDto,
        velocity: f32,
        #[serde(default = "default_lifespan")]
        lifespan: f32,
        #[serde(default = "default_start_delay")]
        start_delay: f32,
    },
}

impl From<ZoneKindDto> for ZoneTemplate {
    fn from(kind: ZoneKindDto) -> Self {
        match kind {
            ZoneKindDto::Pickup { value } => ZoneTemplate::Pickup { value },
            ZoneKindDto::Hazard => ZoneTemplate::Hazard,
            ZoneKindDto::Enemy {
                speed,
                movement,
                destroyed_on_hit,
                blink_duration,
                path,
            } => ZoneTemplate::Enemy {
                stats: EnemyStats {
                    speed,
                    movement_type: movement.into(),
                    destroyed_on_hit,
                    blink_duration,
                },
                path: path.into_iter().map(Vec2::from).collect(),
            },
            ZoneKindDto::Bullet {
                value,
                direction,
                velocity,
                lifespan,
                start_delay,
            } => ZoneTemplate::Bullet {
                value,
                direction: direction.into(),
                velocity,
                lifespan,
                start_delay,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneDto {
    pub kind: ZoneKindDto,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub shape: ShapeDto,
}

fn default_expected_players() -> usize {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelDto {
    #[serde(default)]
    pub visibility: VisibilityDto,
    #[serde(default)]
    pub life: Option<u32>,
    #[serde(default = "default_expected_players")]
    pub expected_players: usize,
    #[serde(default)]
    pub zones: Vec<ZoneDto>,
}

impl Default for LevelDto {
    fn default() -> Self {
        Self {
            visibility: VisibilityDto::default(),
            life: None,
            expected_players: default_expected_players(),
            zones: Vec::new(),
        }
    }
}

impl From<LevelDto> for LevelDefinition {
    fn from(level: LevelDto) -> Self {
        Self {
            visibility: level.visibility.into(),
            life: level.life,
            expected_players: level.expected_players,
            zones: level
                .zones
                .into_iter()
                .map(|zone| ZoneDefinition {
                    template: zone.kind.into(),
                    position: Vec2::new(zone.x, zone.y),
                    shape: zone.shape.into(),
                })
                .collect(),
        }
    }
}
