// Interaction dispatch: applies zone effects when the sphere touches them.

use crate::domain::events::SessionEvent;
use crate::domain::schedule::{DeferredKind, DeferredQueue, EntityKey};
use crate::domain::state::{GameStats, Sphere, Visibility};
use crate::domain::systems::contacts::{ContactPhase, ContactTracker};
use crate::domain::tuning::SphereTuning;
use crate::domain::zone::{InteractionZone, ZoneKind};
use tracing::debug;

/// Life lost per enemy or hazard hit.
const HIT_DAMAGE: u32 = 1;

/// What the caller should do with the zone after an effect ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneOutcome {
    Keep,
    Remove,
}

/// Mutable session state an effect may touch.
pub struct World<'a> {
    pub sphere: &'a mut Sphere,
    pub stats: &'a mut GameStats,
    pub deferred: &'a mut DeferredQueue,
    pub contacts: &'a mut ContactTracker,
    pub events: &'a mut Vec<SessionEvent>,
    pub tuning: &'a SphereTuning,
    pub visibility: Visibility,
    pub playing: bool,
    pub now: f64,
}

impl World<'_> {
    fn lose_life(&mut self, amount: u32) {
        if self.stats.lose_life(amount, self.playing, self.events) {
            self.events.push(SessionEvent::LivesExhausted);
        }
    }

    fn schedule_in(&mut self, entity: EntityKey, kind: DeferredKind, delay: f32) -> bool {
        self.deferred
            .schedule((entity, kind), self.now + f64::from(delay))
    }
}

/// Routes one contact to the effect the zone supports for that phase.
pub fn dispatch(phase: ContactPhase, zone: &mut InteractionZone, world: &mut World<'_>) -> ZoneOutcome {
    let caps = zone.kind.capabilities();
    match phase {
        ContactPhase::Enter if caps.enter => on_enter(zone, world),
        ContactPhase::Stay if caps.stay => on_stay(zone, world),
        ContactPhase::Exit if caps.exit => on_exit(zone, world),
        _ => ZoneOutcome::Keep,
    }
}

pub fn on_enter(zone: &mut InteractionZone, world: &mut World<'_>) -> ZoneOutcome {
    // Pickups score even while the sphere is invincible.
    if world.sphere.invincible && !matches!(zone.kind, ZoneKind::Pickup { .. }) {
        return ZoneOutcome::Keep;
    }

    match &mut zone.kind {
        ZoneKind::Pickup { value } => {
            if !zone.active {
                return ZoneOutcome::Keep;
            }
            zone.active = false;
            world.stats.add_score(*value, world.events);
            if world.visibility.blinks_on_pickup() {
                world.events.push(SessionEvent::SphereBlinked {
                    sphere_id: world.sphere.id,
                });
            }
            world.events.push(SessionEvent::PickupCollected {
                zone_id: zone.id,
                value: *value,
            });
            debug!(zone_id = zone.id, value = *value, "pickup collected");
            ZoneOutcome::Keep
        }
        ZoneKind::Hazard { damage } => {
            let damage = *damage;
            world.lose_life(damage);
            destroy_sphere(world);
            ZoneOutcome::Keep
        }
        ZoneKind::Enemy {
            stats, blinking, ..
        } => {
            if *blinking || world.sphere.damage_cooldown {
                return ZoneOutcome::Keep;
            }
            world.lose_life(HIT_DAMAGE);
            world.events.push(SessionEvent::SphereDamaged {
                sphere_id: world.sphere.id,
            });

            // First hit wins: the sphere ignores every enemy until the
            // longer of its own damage window and this enemy's blink.
            let cooldown = if stats.destroyed_on_hit {
                world.tuning.damage_duration
            } else {
                world.tuning.damage_duration.max(stats.blink_duration)
            };
            world.sphere.damage_cooldown = true;
            let sphere = EntityKey::Sphere(world.sphere.id);
            world.schedule_in(sphere, DeferredKind::SphereDamageEnd, cooldown);

            if stats.destroyed_on_hit {
                debug!(zone_id = zone.id, "enemy destroyed on hit");
                return ZoneOutcome::Remove;
            }

            *blinking = true;
            let duration = stats.blink_duration;
            world.schedule_in(EntityKey::Zone(zone.id), DeferredKind::EnemyBlinkEnd, duration);
            world.events.push(SessionEvent::EnemyBlinkStarted {
                zone_id: zone.id,
                duration,
            });
            ZoneOutcome::Keep
        }
        ZoneKind::Bullet {
            value, velocity, ..
        } => {
            world.stats.add_score(-*value, world.events);
            *velocity = 0.0;
            if world.visibility == Visibility::Invisible {
                world.events.push(SessionEvent::SphereDamaged {
                    sphere_id: world.sphere.id,
                });
            }
            ZoneOutcome::Remove
        }
    }
}

pub fn on_stay(zone: &mut InteractionZone, world: &mut World<'_>) -> ZoneOutcome {
    if world.sphere.invincible {
        return ZoneOutcome::Keep;
    }
    if let ZoneKind::Hazard { damage } = zone.kind {
        world.lose_life(damage);
        destroy_sphere(world);
    }
    ZoneOutcome::Keep
}

/// Exit effects are reserved; hazards accept the call but do nothing yet.
pub fn on_exit(_zone: &mut InteractionZone, _world: &mut World<'_>) -> ZoneOutcome {
    ZoneOutcome::Keep
}

/// Destroys the sphere and schedules its respawn.
///
/// Returns false without side effects if the sphere is already invincible,
/// so repeated calls before the respawn schedule it only once.
pub fn destroy_sphere(world: &mut World<'_>) -> bool {
    if world.sphere.invincible {
        return false;
    }

    let sphere = &mut *world.sphere;
    sphere.invincible = true;
    sphere.destroyed = true;
    sphere.moved = false;
    sphere.velocity = glam::Vec2::ZERO;
    let sphere_id = sphere.id;

    world.contacts.clear();
    let entity = EntityKey::Sphere(sphere_id);
    world.deferred.cancel_entity(entity);
    let delay = world.tuning.respawn_delay;
    world.schedule_in(entity, DeferredKind::Respawn, delay);
    world.events.push(SessionEvent::SphereDestroyed { sphere_id });
    debug!(sphere_id, "sphere destroyed");
    true
}
