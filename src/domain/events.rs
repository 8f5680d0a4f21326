// Outbound notifications raised by the session during a tick.
// Presentation concerns (blink, damage, fade) are only signalled here.

use glam::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LevelStarted,
    SpherePositionChanged { position: Vec2 },
    SphereMoved { moved: bool },
    ScoreChanged { score: i32, delta: i32 },
    LifeChanged { life: u32 },
    LifeCritical { critical: bool },
    LivesExhausted,
    SphereDestroyed { sphere_id: u64 },
    SphereRespawned { sphere_id: u64, position: Vec2 },
    SphereBlinked { sphere_id: u64 },
    SphereDamaged { sphere_id: u64 },
    SphereFaded { sphere_id: u64 },
    VisibilityApplied { sphere_id: u64 },
    PickupCollected { zone_id: u64, value: i32 },
    EnemyBlinkStarted { zone_id: u64, duration: f32 },
    EnemyBlinkEnded { zone_id: u64 },
    ZoneRemoved { zone_id: u64 },
}
