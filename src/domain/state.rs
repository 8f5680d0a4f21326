// Domain-level simulation entities and snapshot types.

use super::events::SessionEvent;
use glam::Vec2;

/// Radius used to normalise the proximity criterion.
const PROXIMITY_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    FadeAfterStart,
    Invisible,
}

impl Visibility {
    /// Pickups blink the sphere so players can find it again.
    pub fn blinks_on_pickup(self) -> bool {
        matches!(self, Visibility::FadeAfterStart | Visibility::Invisible)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub mass: f32,
    pub position: Vec2,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
}

/// The shared centroid-of-mass entity.
#[derive(Debug, Clone)]
pub struct Sphere {
    /// Generation id, bumped on every (re)creation.
    pub id: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub moved: bool,

    // Combat state.
    pub invincible: bool,
    pub destroyed: bool,
    pub damage_cooldown: bool,

    // Presentation state mirrored for late joiners.
    pub faded: bool,
}

impl Sphere {
    pub fn spawn(id: u64, position: Vec2) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            moved: false,
            invincible: false,
            destroyed: false,
            damage_cooldown: false,
            faded: false,
        }
    }

    /// Closeness of `target` to the sphere as a percentage, 99 at the centre.
    pub fn proximity_criterion(&self, target: Vec2) -> f32 {
        let criterion =
            self.position.distance_squared(target) / (PROXIMITY_RADIUS * PROXIMITY_RADIUS);
        100.0 * (1.0 - criterion.max(0.01))
    }
}

#[derive(Debug, Clone)]
pub struct SphereSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub moved: bool,
    pub invincible: bool,
    pub destroyed: bool,
    pub faded: bool,
}

/// Score and life bookkeeping shared by the whole session.
#[derive(Debug, Clone)]
pub struct GameStats {
    pub score: i32,
    pub life: u32,
    pub critical: bool,
}

impl GameStats {
    pub fn new(life: u32) -> Self {
        Self {
            score: 0,
            life,
            critical: false,
        }
    }

    pub fn add_score(&mut self, delta: i32, events: &mut Vec<SessionEvent>) {
        if delta == 0 {
            return;
        }
        self.score = self.score.saturating_add(delta);
        events.push(SessionEvent::ScoreChanged {
            score: self.score,
            delta,
        });
    }

    /// Removes life, saturating at zero. Returns true when this call emptied it.
    pub fn lose_life(&mut self, amount: u32, playing: bool, events: &mut Vec<SessionEvent>) -> bool {
        if amount == 0 || self.life == 0 {
            return false;
        }
        self.life = self.life.saturating_sub(amount);
        events.push(SessionEvent::LifeChanged { life: self.life });
        self.refresh_critical(playing, events);
        self.life == 0
    }

    pub fn reset_life(&mut self, life: u32, playing: bool, events: &mut Vec<SessionEvent>) {
        self.life = life;
        events.push(SessionEvent::LifeChanged { life });
        self.refresh_critical(playing, events);
    }

    pub fn refresh_critical(&mut self, playing: bool, events: &mut Vec<SessionEvent>) {
        let critical = playing && self.life <= 1;
        if critical != self.critical {
            self.critical = critical;
            events.push(SessionEvent::LifeCritical { critical });
        }
    }
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
            mass: p.mass,
        }
    }
}

impl From<&Sphere> for SphereSnapshot {
    fn from(s: &Sphere) -> Self {
        Self {
            id: s.id,
            x: s.position.x,
            y: s.position.y,
            vx: s.velocity.x,
            vy: s.velocity.y,
            moved: s.moved,
            invincible: s.invincible,
            destroyed: s.destroyed,
            faded: s.faded,
        }
    }
}
