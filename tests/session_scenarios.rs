use cdm_server::domain::tuning::{PlayerTuning, SphereTuning};
use cdm_server::domain::{
    EnemyStats, LevelDefinition, SessionContext, SessionEvent, ZoneDefinition, ZoneShape,
    ZoneTemplate,
};
use glam::Vec2;

const DT: f32 = 0.02;

fn session(level: LevelDefinition) -> SessionContext {
    SessionContext::new(SphereTuning::default(), PlayerTuning::default(), level)
}

fn zone(template: ZoneTemplate, x: f32, y: f32, shape: ZoneShape) -> ZoneDefinition {
    ZoneDefinition {
        template,
        position: Vec2::new(x, y),
        shape,
    }
}

fn run(s: &mut SessionContext, ticks: usize) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        s.tick(DT);
        events.extend(s.drain_events());
    }
    events
}

#[test]
fn test_centroid_ignores_join_order() {
    let players = [
        (1, 1.5, Vec2::new(-3.25, 7.0)),
        (2, 0.75, Vec2::new(11.0, -2.5)),
        (3, 4.0, Vec2::new(0.125, 0.5)),
        (4, 2.0, Vec2::new(6.0, 6.0)),
    ];

    let mut forward = session(LevelDefinition::default());
    let mut backward = session(LevelDefinition::default());
    for &(id, mass, pos) in &players {
        forward.player_joined(id, Some(mass), Some(pos)).unwrap();
    }
    for &(id, mass, pos) in players.iter().rev() {
        backward.player_joined(id, Some(mass), Some(pos)).unwrap();
    }
    forward.tick(DT);
    backward.tick(DT);

    assert_eq!(
        forward.sphere().position.to_array(),
        backward.sphere().position.to_array()
    );
}

#[test]
fn test_single_player_centroid_is_exact() {
    let mut s = session(LevelDefinition::default());
    let pos = Vec2::new(0.1, 1.0 / 3.0);
    s.player_joined(1, Some(7.3), Some(pos)).unwrap();

    s.tick(DT);

    assert_eq!(s.sphere().position, pos);
}

#[test]
fn test_overlapping_enemies_cost_one_life() {
    let stats = EnemyStats::default();
    let circle = ZoneShape::Circle { radius: 1.0 };
    let level = LevelDefinition {
        zones: vec![
            zone(ZoneTemplate::Enemy { stats, path: vec![] }, 0.0, 0.0, circle),
            zone(ZoneTemplate::Enemy { stats, path: vec![] }, 0.5, 0.0, circle),
        ],
        ..LevelDefinition::default()
    };
    let mut s = session(level);
    s.player_joined(1, None, Some(Vec2::ZERO)).unwrap();

    let events = run(&mut s, 10);

    assert_eq!(s.stats().life, 2);
    let damaged = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::SphereDamaged { .. }))
        .count();
    assert_eq!(damaged, 1);
}

#[test]
fn test_collected_pickup_does_not_score_on_reentry() {
    let level = LevelDefinition {
        zones: vec![zone(
            ZoneTemplate::Pickup { value: 3 },
            0.0,
            0.0,
            ZoneShape::Rect {
                half_width: 1.0,
                half_height: 1.0,
            },
        )],
        ..LevelDefinition::default()
    };
    let mut s = session(level);
    s.player_joined(1, None, Some(Vec2::ZERO)).unwrap();
    run(&mut s, 2);

    s.report_position(1, Vec2::new(10.0, 0.0)).unwrap();
    run(&mut s, 2);
    s.report_position(1, Vec2::ZERO).unwrap();
    let events = run(&mut s, 2);

    assert_eq!(s.stats().score, 3);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::PickupCollected { .. }))
    );
}

#[test]
fn test_camping_in_a_hazard_drains_life_once_per_respawn() {
    let level = LevelDefinition {
        zones: vec![zone(
            ZoneTemplate::Hazard,
            0.0,
            0.0,
            ZoneShape::Circle { radius: 2.0 },
        )],
        ..LevelDefinition::default()
    };
    let mut s = session(level);
    s.player_joined(1, None, Some(Vec2::ZERO)).unwrap();

    let events = run(&mut s, 40);
    assert_eq!(s.stats().life, 2);

    let mut events = events;
    events.extend(run(&mut s, 110));

    assert_eq!(s.stats().life, 0);
    let exhausted = events
        .iter()
        .filter(|e| **e == SessionEvent::LivesExhausted)
        .count();
    assert_eq!(exhausted, 1);
}

#[test]
fn test_unknown_players_are_reported_not_fatal() {
    let mut s = session(LevelDefinition::default());
    s.player_joined(1, Some(1.0), Some(Vec2::ONE)).unwrap();

    assert!(s.report_position(99, Vec2::ZERO).is_err());
    assert!(s.set_mass(99, 2.0).is_err());
    assert!(s.player_joined(1, Some(1.0), Some(Vec2::ZERO)).is_err());
    assert!(s.player_joined(2, Some(0.0), None).is_err());

    s.tick(DT);
    assert_eq!(s.sphere().position, Vec2::ONE);
    assert_eq!(s.engine().active_count(), 1);
}
