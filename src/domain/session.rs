// Session context: the single owner of all authoritative game state.
// Created per lobby and driven exclusively by its world task.

use super::errors::CentroidError;
use super::events::SessionEvent;
use super::level::{LevelDefinition, ZoneDefinition, ZoneTemplate};
use super::path::EnemyPath;
use super::schedule::{DeferredKind, DeferredQueue, EntityKey};
use super::state::{GameStats, PlayerSnapshot, Sphere, SphereSnapshot, Visibility};
use super::systems::dispatch::{self, World, ZoneOutcome};
use super::systems::{CentroidEngine, ContactTracker, spawn_point, zones};
use super::tuning::{PlayerTuning, SphereTuning};
use super::zone::{InteractionZone, ZoneKind, ZoneSnapshot};
use glam::Vec2;
use tracing::{debug, info};

/// Life removed by a hazard contact.
const HAZARD_DAMAGE: u32 = 1;

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub sphere: SphereSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub zones: Vec<ZoneSnapshot>,
    pub score: i32,
    pub life: u32,
    pub critical: bool,
    pub paused: bool,
}

pub struct SessionContext {
    sphere_tuning: SphereTuning,
    player_tuning: PlayerTuning,

    engine: CentroidEngine,
    sphere: Sphere,
    next_sphere_id: u64,

    zones: Vec<InteractionZone>,
    next_zone_id: u64,
    contacts: ContactTracker,

    deferred: DeferredQueue,
    stats: GameStats,
    visibility: Visibility,
    expected_players: usize,

    // Seconds of unpaused simulation.
    clock: f64,
    events: Vec<SessionEvent>,

    // Last values published, so change events fire only on change.
    last_position: Option<Vec2>,
    last_moved: bool,
}

impl SessionContext {
    pub fn new(
        sphere_tuning: SphereTuning,
        player_tuning: PlayerTuning,
        level: LevelDefinition,
    ) -> Self {
        let mut session = Self {
            sphere_tuning,
            player_tuning,
            engine: CentroidEngine::new(sphere_tuning.move_tolerance),
            sphere: Sphere::spawn(0, Vec2::ZERO),
            next_sphere_id: 0,
            zones: Vec::new(),
            next_zone_id: 0,
            contacts: ContactTracker::new(),
            deferred: DeferredQueue::new(),
            stats: GameStats::new(sphere_tuning.starting_life),
            visibility: level.visibility,
            expected_players: level.expected_players,
            clock: 0.0,
            events: Vec::new(),
            last_position: None,
            last_moved: false,
        };
        session.load_level(level);
        session
    }

    /// Replaces the level geometry and recreates the sphere.
    ///
    /// Score carries over between levels; life is reset.
    pub fn load_level(&mut self, level: LevelDefinition) {
        self.deferred.clear();
        self.contacts.clear();
        self.zones.clear();
        self.visibility = level.visibility;
        self.expected_players = level.expected_players.max(1);

        for definition in level.zones {
            self.spawn_zone(definition);
        }

        let life = level.life.unwrap_or(self.sphere_tuning.starting_life);
        let playing = !self.engine.is_paused();
        self.stats.reset_life(life, playing, &mut self.events);
        self.events.push(SessionEvent::LevelStarted);
        self.spawn_sphere();
        info!(
            zones = self.zones.len(),
            life,
            visibility = ?self.visibility,
            "level started"
        );
    }

    /// Adds one zone to the running level and returns its id.
    pub fn spawn_zone(&mut self, definition: ZoneDefinition) -> u64 {
        self.next_zone_id += 1;
        let id = self.next_zone_id;
        let now = self.clock;

        let kind = match definition.template {
            ZoneTemplate::Pickup { value } => ZoneKind::Pickup { value },
            ZoneTemplate::Hazard => ZoneKind::Hazard {
                damage: HAZARD_DAMAGE,
            },
            ZoneTemplate::Enemy { stats, path } => {
                let mut path = EnemyPath::new(path);
                path.start(definition.position, now);
                ZoneKind::Enemy {
                    stats,
                    path,
                    blinking: false,
                }
            }
            ZoneTemplate::Bullet {
                value,
                direction,
                velocity,
                lifespan,
                start_delay,
            } => {
                let entity = EntityKey::Zone(id);
                self.deferred.schedule(
                    (entity, DeferredKind::BulletArm),
                    now + f64::from(start_delay),
                );
                self.deferred.schedule(
                    (entity, DeferredKind::BulletExpire),
                    now + f64::from(lifespan),
                );
                ZoneKind::Bullet {
                    value,
                    direction,
                    velocity,
                    armed: false,
                }
            }
        };

        self.zones.push(InteractionZone {
            id,
            kind,
            position: definition.position,
            shape: definition.shape,
            active: true,
        });
        id
    }

    /// Registers a player. Missing mass or position fall back to the
    /// default mass and the next spawn point on the start circle.
    pub fn player_joined(
        &mut self,
        player_id: u64,
        mass: Option<f32>,
        position: Option<Vec2>,
    ) -> Result<(), CentroidError> {
        let mass = mass.unwrap_or(self.player_tuning.default_mass);
        let position = position.unwrap_or_else(|| {
            let slot = self.engine.active_count();
            let count = self.expected_players.max(slot + 1);
            spawn_point(slot, count, self.player_tuning.spawn_radius)
        });
        self.engine.register_player(player_id, mass, position)
    }

    pub fn player_left(&mut self, player_id: u64) -> Result<(), CentroidError> {
        self.engine.remove_player(player_id)
    }

    pub fn report_position(&mut self, player_id: u64, position: Vec2) -> Result<(), CentroidError> {
        self.engine.report_position(player_id, position)
    }

    pub fn set_mass(&mut self, player_id: u64, mass: f32) -> Result<(), CentroidError> {
        self.engine.set_mass(player_id, mass)
    }

    /// Freezes physics, timers and zone motion without discarding state.
    pub fn set_paused(&mut self, paused: bool) {
        self.engine.set_paused(paused);
        if paused {
            self.sphere.moved = false;
            self.sphere.velocity = Vec2::ZERO;
        }
        self.stats.refresh_critical(!paused, &mut self.events);
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    /// Advances one fixed step. Returns whether the sphere moved.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.engine.is_paused() {
            return false;
        }

        self.clock += f64::from(dt);
        self.run_deferred();

        let sphere_position = (!self.sphere.destroyed).then_some(self.sphere.position);
        zones::tick_zones(&mut self.zones, sphere_position, self.clock, dt);

        if !self.sphere.destroyed {
            self.engine.tick(&mut self.sphere, dt);
            // An empty session has no sphere in play; the next player starts
            // from a clean contact set.
            if self.engine.active_count() > 0 {
                self.resolve_contacts();
            } else {
                self.contacts.clear();
            }
        }

        self.publish_motion();
        self.sphere.moved
    }

    fn resolve_contacts(&mut self) {
        let contacts =
            self.contacts
                .update(self.sphere.position, self.sphere_tuning.radius, &self.zones);

        let mut removed = Vec::new();
        for contact in contacts {
            // Nothing else touches a sphere destroyed earlier in this tick.
            if self.sphere.destroyed {
                break;
            }
            let Some(zone) = self.zones.iter_mut().find(|z| z.id == contact.zone_id) else {
                continue;
            };

            let mut world = World {
                sphere: &mut self.sphere,
                stats: &mut self.stats,
                deferred: &mut self.deferred,
                contacts: &mut self.contacts,
                events: &mut self.events,
                tuning: &self.sphere_tuning,
                visibility: self.visibility,
                playing: true,
                now: self.clock,
            };
            if dispatch::dispatch(contact.phase, zone, &mut world) == ZoneOutcome::Remove {
                removed.push(zone.id);
            }
        }

        for zone_id in removed {
            self.remove_zone(zone_id);
        }
    }

    fn run_deferred(&mut self) {
        for key in self.deferred.poll(self.clock) {
            match key {
                (EntityKey::Sphere(id), DeferredKind::Respawn) => self.respawn(id),
                (EntityKey::Sphere(id), DeferredKind::FadeOut) => {
                    if id == self.sphere.id && !self.sphere.destroyed {
                        self.sphere.faded = true;
                        self.events.push(SessionEvent::SphereFaded { sphere_id: id });
                    }
                }
                (EntityKey::Sphere(id), DeferredKind::SphereDamageEnd) => {
                    if id == self.sphere.id {
                        self.sphere.damage_cooldown = false;
                    }
                }
                (EntityKey::Zone(id), DeferredKind::EnemyBlinkEnd) => {
                    let zone = self.zones.iter_mut().find(|z| z.id == id);
                    if let Some(ZoneKind::Enemy { blinking, .. }) = zone.map(|z| &mut z.kind) {
                        *blinking = false;
                        self.events.push(SessionEvent::EnemyBlinkEnded { zone_id: id });
                    }
                }
                (EntityKey::Zone(id), DeferredKind::BulletArm) => {
                    let zone = self.zones.iter_mut().find(|z| z.id == id);
                    if let Some(ZoneKind::Bullet { armed, .. }) = zone.map(|z| &mut z.kind) {
                        *armed = true;
                    }
                }
                (EntityKey::Zone(id), DeferredKind::BulletExpire) => self.remove_zone(id),
                (entity, kind) => debug!(?entity, ?kind, "stale deferred effect"),
            }
        }
    }

    fn remove_zone(&mut self, zone_id: u64) {
        let before = self.zones.len();
        self.zones.retain(|z| z.id != zone_id);
        if self.zones.len() == before {
            return;
        }
        self.deferred.cancel_entity(EntityKey::Zone(zone_id));
        self.contacts.forget(zone_id);
        self.events.push(SessionEvent::ZoneRemoved { zone_id });
    }

    fn respawn(&mut self, sphere_id: u64) {
        if sphere_id != self.sphere.id || !self.sphere.destroyed {
            return;
        }
        self.contacts.clear();
        let sphere_id = self.spawn_sphere();
        let position = self.sphere.position;
        self.events.push(SessionEvent::SphereRespawned {
            sphere_id,
            position,
        });
        info!(sphere_id, x = position.x, y = position.y, "sphere respawned");
    }

    /// Creates the next sphere generation on the current centroid.
    fn spawn_sphere(&mut self) -> u64 {
        self.next_sphere_id += 1;
        let sphere_id = self.next_sphere_id;
        self.sphere = Sphere::spawn(sphere_id, self.engine.centroid());

        let entity = EntityKey::Sphere(sphere_id);
        match self.visibility {
            Visibility::Visible => {
                self.events
                    .push(SessionEvent::VisibilityApplied { sphere_id });
            }
            Visibility::FadeAfterStart => {
                let due = self.clock + f64::from(self.sphere_tuning.fade_delay);
                self.deferred.schedule((entity, DeferredKind::FadeOut), due);
            }
            Visibility::Invisible => {
                self.deferred
                    .schedule((entity, DeferredKind::FadeOut), self.clock);
            }
        }
        sphere_id
    }

    fn publish_motion(&mut self) {
        let position = self.sphere.position;
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            self.events
                .push(SessionEvent::SpherePositionChanged { position });
        }
        if self.last_moved != self.sphere.moved {
            self.last_moved = self.sphere.moved;
            self.events.push(SessionEvent::SphereMoved {
                moved: self.sphere.moved,
            });
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sphere: SphereSnapshot::from(&self.sphere),
            players: self.engine.players().map(PlayerSnapshot::from).collect(),
            zones: self.zones.iter().map(ZoneSnapshot::from).collect(),
            score: self.stats.score,
            life: self.stats.life,
            critical: self.stats.critical,
            paused: self.engine.is_paused(),
        }
    }

    pub fn sphere(&self) -> &Sphere {
        &self.sphere
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn zones(&self) -> &[InteractionZone] {
        &self.zones
    }

    pub fn engine(&self) -> &CentroidEngine {
        &self.engine
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }
}
