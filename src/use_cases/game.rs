use super::types::{GameEvent, ServerState, WorldUpdate};
use crate::domain::{SessionContext, SessionEvent, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info, warn};

impl WorldUpdate {
    pub fn from_snapshot(tick: u64, snapshot: SessionSnapshot) -> Self {
        Self {
            tick,
            sphere: snapshot.sphere,
            players: snapshot.players,
            zones: snapshot.zones,
            score: snapshot.score,
            life: snapshot.life,
            critical: snapshot.critical,
        }
    }
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    events_tx: broadcast::Sender<SessionEvent>,
    server_state_tx: watch::Sender<ServerState>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
    mut session: SessionContext,
) {
    let mut tick: u64 = 0;
    let dt = tick_interval.as_secs_f32();

    let _ = server_state_tx.send(ServerState::LevelRunning);

    // Drive the fixed-step session loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the lobby is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(ev) = input_rx.try_recv() {
            apply_event(&mut session, ev, &server_state_tx);
        }

        session.tick(dt);
        tick += 1;

        for event in session.drain_events() {
            if event == SessionEvent::LivesExhausted {
                warn!(tick, "lives exhausted; level failed");
                session.set_paused(true);
                let _ = server_state_tx.send(ServerState::LevelFailed);
            }
            // No subscribers is fine; events are fire-and-forget.
            let _ = events_tx.send(event);
        }

        let _ = world_tx.send(WorldUpdate::from_snapshot(tick, session.snapshot()));
    }

    info!(tick, "world task stopped");
}

fn apply_event(
    session: &mut SessionContext,
    ev: GameEvent,
    server_state_tx: &watch::Sender<ServerState>,
) {
    match ev {
        GameEvent::Join {
            player_id,
            mass,
            position,
        } => match session.player_joined(player_id, mass, position) {
            Ok(()) => info!(player_id, "player joined"),
            Err(error) => warn!(player_id, %error, "join rejected"),
        },
        GameEvent::Leave { player_id } => match session.player_left(player_id) {
            Ok(()) => info!(player_id, "player left"),
            Err(error) => debug!(player_id, %error, "leave ignored"),
        },
        GameEvent::Position {
            player_id,
            position,
        } => {
            if let Err(error) = session.report_position(player_id, position) {
                debug!(player_id, %error, "position report ignored");
            }
        }
        GameEvent::SetMass { player_id, mass } => {
            if let Err(error) = session.set_mass(player_id, mass) {
                warn!(player_id, mass, %error, "mass update rejected");
            }
        }
        GameEvent::Pause => {
            if *server_state_tx.borrow() == ServerState::LevelRunning {
                session.set_paused(true);
                let _ = server_state_tx.send(ServerState::Paused);
                info!("session paused");
            }
        }
        GameEvent::Resume => {
            // A failed level stays frozen until the next level loads.
            if *server_state_tx.borrow() == ServerState::Paused {
                session.set_paused(false);
                let _ = server_state_tx.send(ServerState::LevelRunning);
                info!("session resumed");
            }
        }
        GameEvent::LoadLevel(level) => {
            session.load_level(*level);
            session.set_paused(false);
            let _ = server_state_tx.send(ServerState::LevelRunning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::{PlayerTuning, SphereTuning};
    use crate::domain::{LevelDefinition, ZoneDefinition, ZoneShape, ZoneTemplate};
    use glam::Vec2;

    struct Running {
        input_tx: mpsc::Sender<GameEvent>,
        world_rx: broadcast::Receiver<WorldUpdate>,
        events_rx: broadcast::Receiver<SessionEvent>,
        state_rx: watch::Receiver<ServerState>,
        shutdown: Arc<Notify>,
    }

    fn spawn(level: LevelDefinition) -> Running {
        let (input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, world_rx) = broadcast::channel(256);
        let (events_tx, events_rx) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());
        let session = SessionContext::new(SphereTuning::default(), PlayerTuning::default(), level);

        tokio::spawn(world_task(
            input_rx,
            world_tx,
            events_tx,
            state_tx,
            Duration::from_millis(5),
            shutdown.clone(),
            session,
        ));

        Running {
            input_tx,
            world_rx,
            events_rx,
            state_rx,
            shutdown,
        }
    }

    async fn next_update(rx: &mut broadcast::Receiver<WorldUpdate>) -> WorldUpdate {
        loop {
            match rx.recv().await {
                Ok(update) => return update,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("world channel closed: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn when_players_join_then_world_updates_carry_the_centroid() {
        let mut running = spawn(LevelDefinition::default());
        for (player_id, x) in [(1, 0.0), (2, 10.0)] {
            running
                .input_tx
                .send(GameEvent::Join {
                    player_id,
                    mass: Some(1.0),
                    position: Some(Vec2::new(x, 0.0)),
                })
                .await
                .unwrap();
        }

        let update = loop {
            let update = next_update(&mut running.world_rx).await;
            if update.players.len() == 2 {
                break update;
            }
        };

        assert_eq!((update.sphere.x, update.sphere.y), (5.0, 0.0));
        assert_eq!(*running.state_rx.borrow(), ServerState::LevelRunning);
        running.shutdown.notify_one();
    }

    #[tokio::test]
    async fn when_lives_run_out_then_level_fails_and_pauses() {
        let level = LevelDefinition {
            life: Some(1),
            zones: vec![ZoneDefinition {
                template: ZoneTemplate::Hazard,
                position: Vec2::ZERO,
                shape: ZoneShape::Circle { radius: 1.0 },
            }],
            ..LevelDefinition::default()
        };
        let mut running = spawn(level);
        running
            .input_tx
            .send(GameEvent::Join {
                player_id: 1,
                mass: None,
                position: Some(Vec2::ZERO),
            })
            .await
            .unwrap();

        running
            .state_rx
            .wait_for(|s| *s == ServerState::LevelFailed)
            .await
            .unwrap();

        let mut exhausted = false;
        while let Ok(event) = running.events_rx.try_recv() {
            exhausted |= event == SessionEvent::LivesExhausted;
        }
        assert!(exhausted);

        // Resume does not revive a failed level.
        running.input_tx.send(GameEvent::Resume).await.unwrap();
        let update = next_update(&mut running.world_rx).await;
        let update = loop {
            let next = next_update(&mut running.world_rx).await;
            if next.tick > update.tick + 2 {
                break next;
            }
        };
        assert_eq!(update.life, 0);
        assert_eq!(*running.state_rx.borrow(), ServerState::LevelFailed);
        running.shutdown.notify_one();
    }
}
