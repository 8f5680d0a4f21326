// Enter/stay/exit contact tracking between the sphere and zones.

use crate::domain::zone::InteractionZone;
use glam::Vec2;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Stay,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub zone_id: u64,
    pub phase: ContactPhase,
}

#[derive(Debug, Default)]
pub struct ContactTracker {
    touching: BTreeSet<u64>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs this tick's overlaps against the last tick's.
    ///
    /// Zones that were removed or deactivated while touching are dropped
    /// without an exit.
    pub fn update(&mut self, center: Vec2, radius: f32, zones: &[InteractionZone]) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let mut touching = BTreeSet::new();

        for zone in zones.iter().filter(|z| z.active) {
            let overlaps = zone.shape.overlaps_circle(zone.position, center, radius);
            let was_touching = self.touching.contains(&zone.id);

            let phase = match (overlaps, was_touching) {
                (true, true) => Some(ContactPhase::Stay),
                (true, false) => Some(ContactPhase::Enter),
                (false, true) => Some(ContactPhase::Exit),
                (false, false) => None,
            };
            if overlaps {
                touching.insert(zone.id);
            }
            if let Some(phase) = phase {
                contacts.push(Contact {
                    zone_id: zone.id,
                    phase,
                });
            }
        }

        self.touching = touching;
        contacts
    }

    pub fn is_touching(&self, zone_id: u64) -> bool {
        self.touching.contains(&zone_id)
    }

    pub fn forget(&mut self, zone_id: u64) {
        self.touching.remove(&zone_id);
    }

    pub fn clear(&mut self) {
        self.touching.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::zone::{ZoneKind, ZoneShape};

    fn lava(id: u64, x: f32) -> InteractionZone {
        InteractionZone {
            id,
            kind: ZoneKind::Hazard { damage: 1 },
            position: Vec2::new(x, 0.0),
            shape: ZoneShape::Circle { radius: 1.0 },
            active: true,
        }
    }

    fn phases(contacts: &[Contact]) -> Vec<(u64, ContactPhase)> {
        contacts.iter().map(|c| (c.zone_id, c.phase)).collect()
    }

    #[test]
    fn when_sphere_crosses_a_zone_then_enter_stay_exit_are_reported() {
        let zones = vec![lava(1, 0.0)];
        let mut tracker = ContactTracker::new();

        let entered = tracker.update(Vec2::ZERO, 0.5, &zones);
        assert_eq!(phases(&entered), vec![(1, ContactPhase::Enter)]);

        let stayed = tracker.update(Vec2::new(0.5, 0.0), 0.5, &zones);
        assert_eq!(phases(&stayed), vec![(1, ContactPhase::Stay)]);

        let exited = tracker.update(Vec2::new(5.0, 0.0), 0.5, &zones);
        assert_eq!(phases(&exited), vec![(1, ContactPhase::Exit)]);

        assert!(tracker.update(Vec2::new(5.0, 0.0), 0.5, &zones).is_empty());
    }

    #[test]
    fn when_zone_is_deactivated_while_touching_then_no_exit_is_reported() {
        let mut zones = vec![lava(1, 0.0), lava(2, 10.0)];
        let mut tracker = ContactTracker::new();
        tracker.update(Vec2::ZERO, 0.5, &zones);

        zones[0].active = false;
        let contacts = tracker.update(Vec2::ZERO, 0.5, &zones);

        assert!(contacts.is_empty());
        assert!(!tracker.is_touching(1));
    }

    #[test]
    fn when_tracker_is_cleared_then_overlap_enters_again() {
        let zones = vec![lava(1, 0.0)];
        let mut tracker = ContactTracker::new();
        tracker.update(Vec2::ZERO, 0.5, &zones);

        tracker.clear();
        let contacts = tracker.update(Vec2::ZERO, 0.5, &zones);

        assert_eq!(phases(&contacts), vec![(1, ContactPhase::Enter)]);
    }
}
