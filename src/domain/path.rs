// Cyclic waypoint follower driving enemy zones.

use super::zone::{EnemyStats, MovementType};
use glam::Vec2;

/// Distance under which a waypoint counts as reached.
const ARRIVAL_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Default)]
pub struct EnemyPath {
    waypoints: Vec<Vec2>,
    index: usize,
    start_time: f64,
    journey_length: f32,
}

/// Moves `current` towards `target` by at most `max_delta`, without overshooting.
/// A negative step leaves `current` in place.
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let max_delta = max_delta.max(0.0);
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_delta
    }
}

impl EnemyPath {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints,
            ..Self::default()
        }
    }

    /// Starts the first leg from `position`.
    pub fn start(&mut self, position: Vec2, now: f64) {
        self.index = 0;
        self.start_time = now;
        self.journey_length = self
            .destination()
            .map(|dest| position.distance(dest))
            .unwrap_or(0.0);
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Advances one tick and returns the new position.
    pub fn step(
        &mut self,
        position: Vec2,
        stats: &EnemyStats,
        sphere: Option<Vec2>,
        now: f64,
        dt: f32,
    ) -> Vec2 {
        let Some(dest) = self.destination() else {
            return position;
        };

        let next = match stats.movement_type {
            MovementType::Linear => move_towards(position, dest, stats.speed * dt),
            MovementType::Lerp => {
                let covered = (now - self.start_time) as f32 * stats.speed;
                let fraction = if self.journey_length > ARRIVAL_EPSILON {
                    covered / self.journey_length
                } else {
                    1.0
                };
                position.lerp(dest, fraction.clamp(0.0, 1.0))
            }
            MovementType::Teleport => {
                if self.start_time + f64::from(stats.speed) <= now {
                    dest
                } else {
                    position
                }
            }
            MovementType::Follow => sphere
                .map(|target| move_towards(position, target, stats.speed * dt))
                .unwrap_or(position),
        };

        if next.distance(dest) > ARRIVAL_EPSILON {
            return next;
        }

        self.index = (self.index + 1) % self.waypoints.len();
        self.start_time = now;
        self.journey_length = self
            .destination()
            .map(|following| dest.distance(following))
            .unwrap_or(0.0);
        dest
    }
}
