use crate::domain::zone::{InteractionZone, ZoneKind};
use glam::Vec2;

/// Moves enemies along their paths and armed bullets along their heading.
pub fn tick_zones(zones: &mut [InteractionZone], sphere: Option<Vec2>, now: f64, dt: f32) {
    for zone in zones.iter_mut().filter(|z| z.active) {
        match &mut zone.kind {
            ZoneKind::Enemy { stats, path, .. } => {
                zone.position = path.step(zone.position, stats, sphere, now, dt);
            }
            ZoneKind::Bullet {
                direction,
                velocity,
                armed: true,
                ..
            } => {
                zone.position += *direction * *velocity * dt;
            }
            _ => {}
        }
    }
}
