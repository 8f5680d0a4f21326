// Centroid-of-mass reduction of all active players onto the shared sphere.

use crate::domain::errors::CentroidError;
use crate::domain::state::{Player, Sphere};
use glam::Vec2;
use std::collections::BTreeMap;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentroidTick {
    pub position: Vec2,
    pub moved: bool,
}

/// Players are kept ordered by id so the weighted sum is computed in the
/// same order no matter how they joined.
#[derive(Debug)]
pub struct CentroidEngine {
    players: BTreeMap<u64, Player>,
    paused: bool,
    move_tolerance: f32,
}

fn is_valid_mass(mass: f32) -> bool {
    mass.is_finite() && mass > 0.0
}

/// Evenly spaced spawn point `slot` of `count` on a circle of `radius`.
pub fn spawn_point(slot: usize, count: usize, radius: f32) -> Vec2 {
    let count = count.max(1);
    let angle = TAU / count as f32 * (slot % count) as f32;
    Vec2::new(angle.cos(), angle.sin()) * radius
}

impl CentroidEngine {
    pub fn new(move_tolerance: f32) -> Self {
        Self {
            players: BTreeMap::new(),
            paused: false,
            move_tolerance,
        }
    }

    /// Adds a player, or revives one that was removed earlier.
    pub fn register_player(
        &mut self,
        id: u64,
        mass: f32,
        position: Vec2,
    ) -> Result<(), CentroidError> {
        if !is_valid_mass(mass) {
            return Err(CentroidError::InvalidMass);
        }
        if self.players.get(&id).is_some_and(|p| p.active) {
            return Err(CentroidError::DuplicateRegistration);
        }
        self.players.insert(
            id,
            Player {
                id,
                mass,
                position,
                active: true,
            },
        );
        Ok(())
    }

    pub fn remove_player(&mut self, id: u64) -> Result<(), CentroidError> {
        let player = self.active_mut(id)?;
        player.active = false;
        Ok(())
    }

    pub fn set_mass(&mut self, id: u64, mass: f32) -> Result<(), CentroidError> {
        if !is_valid_mass(mass) {
            return Err(CentroidError::InvalidMass);
        }
        self.active_mut(id)?.mass = mass;
        Ok(())
    }

    /// Positions are taken at face value from the owning client.
    pub fn report_position(&mut self, id: u64, position: Vec2) -> Result<(), CentroidError> {
        self.active_mut(id)?.position = position;
        Ok(())
    }

    fn active_mut(&mut self, id: u64) -> Result<&mut Player, CentroidError> {
        self.players
            .get_mut(&id)
            .filter(|p| p.active)
            .ok_or(CentroidError::UnknownPlayer)
    }

    pub fn player(&self, id: u64) -> Option<&Player> {
        self.players.get(&id).filter(|p| p.active)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.active)
    }

    pub fn active_count(&self) -> usize {
        self.players().count()
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Mass-weighted average of the active players.
    pub fn centroid(&self) -> Vec2 {
        let mut active = self.players();
        let Some(first) = active.next() else {
            return Vec2::ZERO;
        };
        let Some(second) = active.next() else {
            return first.position;
        };

        let (weighted, total) = [first, second]
            .into_iter()
            .chain(active)
            .fold((Vec2::ZERO, 0.0_f32), |(sum, mass), p| {
                (sum + p.position * p.mass, mass + p.mass)
            });
        weighted / total
    }

    /// Sets the sphere on the centroid. A no-op while paused.
    pub fn tick(&self, sphere: &mut Sphere, dt: f32) -> CentroidTick {
        if self.paused {
            return CentroidTick {
                position: sphere.position,
                moved: false,
            };
        }

        let target = self.centroid();
        let delta = target - sphere.position;
        sphere.velocity = if dt > 0.0 { delta / dt } else { Vec2::ZERO };
        sphere.moved = delta.length() > self.move_tolerance;
        sphere.position = target;

        CentroidTick {
            position: target,
            moved: sphere.moved,
        }
    }
}
