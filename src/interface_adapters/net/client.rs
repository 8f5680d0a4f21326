use crate::domain::SessionEvent;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientMessage, JoinPayload, ServerMessage, SessionEventDto, WorldUpdateDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{GameEvent, LobbyHandle, ServerState, WorldUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use glam::Vec2;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct LobbyQuery {
    // The lobby id the client wants to join.
    #[serde(default)]
    lobby_id: Option<String>,
    // Stable player id chosen by the client; generated when absent.
    #[serde(default)]
    player_id: Option<u64>,
}

/// Serializes each value once and fans the shared bytes out to every client.
async fn serialize_broadcast<T, F>(
    mut rx: broadcast::Receiver<T>,
    bytes_tx: broadcast::Sender<Utf8Bytes>,
    latest_tx: Option<watch::Sender<Utf8Bytes>>,
    label: &'static str,
    to_message: F,
) where
    T: Clone,
    F: Fn(T) -> ServerMessage,
{
    loop {
        match rx.recv().await {
            Ok(value) => {
                let txt = match serde_json::to_string(&to_message(value)) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, channel = label, "failed to serialize broadcast");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if let Some(latest_tx) = &latest_tx {
                    // Store the latest bytes for lag recovery.
                    let _ = latest_tx.send(bytes.clone());
                }
                let _ = bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, channel = label, "serializer lagged; skipping ahead");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(channel = label, "broadcast closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_lobby_serializers(lobby: &LobbyHandle) {
    tokio::spawn(serialize_broadcast(
        lobby.world_tx.subscribe(),
        lobby.world_bytes_tx.clone(),
        Some(lobby.world_latest_tx.clone()),
        "world",
        |update: WorldUpdate| ServerMessage::WorldUpdate(WorldUpdateDto::from(update)),
    ));
    tokio::spawn(serialize_broadcast(
        lobby.events_tx.subscribe(),
        lobby.events_bytes_tx.clone(),
        None,
        "events",
        |event: SessionEvent| ServerMessage::Event(SessionEventDto::from(event)),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> impl IntoResponse {
    let lobby_id = query
        .lobby_id
        .unwrap_or_else(|| state.default_lobby_id.to_string());

    let lobby = match state.lobby_registry.get_lobby(&lobby_id).await {
        Some(lobby) => lobby,
        None => {
            // Keep not-found responses consistent with the JSON error schema.
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "lobby not found".to_string(),
                }),
            )
                .into_response();
        }
    };

    let player_id = query.player_id.unwrap_or_else(rand_id);
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs across reconnects of one player.
        let conn_id = rand_id();
        let span = info_span!("conn", conn_id, player_id, lobby_id = %lobby.lobby_id);
        handle_socket(socket, lobby, player_id).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, lobby: LobbyHandle, player_id: u64) {
    let mut ctx = match bootstrap_connection(&mut socket, &lobby, player_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!(
        player_id,
        display_name = %ctx.display_name,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    // Count lag recovery snapshots sent to this client.
    lag_recovery: u64,
}

struct ConnCtx {
    player_id: u64,
    display_name: String,
    lobby: LobbyHandle,
    // Token used to verify ownership of the player connection slot.
    player_conn_token: u64,
    // Fires when a newer connection for the same player id takes over.
    player_conn_shutdown: Arc<Notify>,
    input_tx: mpsc::Sender<GameEvent>,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    events_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    server_state_rx: watch::Receiver<ServerState>,

    stats: ConnStats,

    last_input_full_log: Instant,
    last_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    display_name: String,
    mass: Option<f32>,
    position: Option<Vec2>,
    bytes_in: u64,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn bootstrap_connection(
    socket: &mut WebSocket,
    lobby: &LobbyHandle,
    player_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = lobby.world_bytes_tx.subscribe();
    let world_latest_rx = lobby.world_latest_tx.subscribe();
    let events_bytes_rx = lobby.events_bytes_tx.subscribe();
    let server_state_rx = lobby.server_state_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // A newer connection for the same player replaces the older one.
    let player_conn_token = rand_id();
    let player_conn_shutdown = lobby
        .register_or_replace_player_connection(player_id, player_conn_token)
        .await;

    let identity_msg = ServerMessage::Identity {
        player_id: player_id.to_string(),
    };
    if let Err(err) = send_message(socket, &identity_msg).await {
        lobby
            .unregister_player_connection_if_owner(player_id, player_conn_token)
            .await;
        return Err(err);
    }

    // Join happens before initial state so the next snapshot includes the player.
    // If anything after Join fails, compensate with Leave.
    if let Err(err) = lobby
        .input_tx
        .send(GameEvent::Join {
            player_id,
            mass: join.mass,
            position: join.position,
        })
        .await
        .map_err(|_| NetError::InputClosed)
    {
        lobby
            .unregister_player_connection_if_owner(player_id, player_conn_token)
            .await;
        return Err(err);
    }

    // Clone before the await so the watch lock is not held across it.
    let initial_state = *server_state_rx.borrow();
    let state_msg = ServerMessage::GameState(initial_state.into());
    let bytes_out = match send_message(socket, &state_msg).await {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            if lobby
                .unregister_player_connection_if_owner(player_id, player_conn_token)
                .await
            {
                let _ = lobby.input_tx.send(GameEvent::Leave { player_id }).await;
            }
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        display_name: join.display_name,
        lobby: lobby.clone(),
        player_conn_token,
        player_conn_shutdown,
        input_tx: lobby.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        events_bytes_rx,
        server_state_rx,

        stats: ConnStats {
            msgs_in: 1,
            msgs_out: 2,
            bytes_in: join.bytes_in,
            bytes_out,
            ..ConnStats::default()
        },

        last_input_full_log: now,
        last_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn normalize_join(payload: JoinPayload, bytes_in: u64) -> JoinHandshake {
    let display_name: String = payload
        .display_name
        .trim()
        .chars()
        .take(MAX_DISPLAY_NAME_LEN)
        .collect();
    JoinHandshake {
        display_name: if display_name.is_empty() {
            "anonymous".to_string()
        } else {
            display_name
        },
        // Non-finite values fall back to server defaults.
        mass: payload.mass.filter(|m| m.is_finite()),
        position: payload.position.and_then(|p| p.finite()),
        bytes_in,
    }
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => Ok(normalize_join(payload, bytes_in)),
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Maps a parsed client message onto a world-task event, dropping non-finite values.
fn sanitize_message(player_id: u64, msg: ClientMessage) -> Option<GameEvent> {
    match msg {
        ClientMessage::Join(_) => None,
        ClientMessage::Position(point) => point.finite().map(|position| GameEvent::Position {
            player_id,
            position,
        }),
        ClientMessage::SetMass(dto) => dto
            .mass
            .is_finite()
            .then_some(GameEvent::SetMass {
                player_id,
                mass: dto.mass,
            }),
        ClientMessage::Pause => Some(GameEvent::Pause),
        ClientMessage::Resume => Some(GameEvent::Resume),
    }
}

fn forward_event(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(player_id, "input channel full; dropping message");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        // Split borrows so `tokio::select!` can hold them concurrently.
        let ConnCtx {
            input_tx,
            world_bytes_rx,
            world_latest_rx,
            events_bytes_rx,
            server_state_rx,
            player_conn_shutdown,
            stats,
            last_input_full_log,
            last_lag_log,
            last_invalid_input_log,
            close_frame,
            ..
        } = &mut *ctx;

        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    stats,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => matches!(
                        forward_bytes(bytes, socket, stats).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            stats.lag_recovery += 1;
                            matches!(
                                forward_bytes(latest, socket, stats).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            event_msg = events_bytes_rx.recv() => {
                match event_msg {
                    Ok(bytes) => matches!(
                        forward_bytes(bytes, socket, stats).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Events are not replayed; the next world update carries the state.
                        if should_log(last_lag_log) {
                            warn!(missed = n, "session events lagged; dropped");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => {
                        let st = *server_state_rx.borrow_and_update();
                        let msg = ServerMessage::GameState(st.into());
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                stats.msgs_out += 1;
                                stats.bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send server state");
                                true
                            }
                        }
                    }
                    Err(_) => {
                        warn!(player_id, "server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }

            _ = player_conn_shutdown.notified() => {
                // Either a newer connection took over or the lobby is going away.
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection closed by server".into(),
                });
                info!(player_id, "connection shut down by server");
                true
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    stats: &mut ConnStats,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                stats.msgs_in += 1;
                stats.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(msg) => match sanitize_message(player_id, msg) {
                        Some(event) => forward_event(player_id, input_tx, event, last_input_full_log),
                        None => {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "invalid values (NaN/inf); dropping");
                            }
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        stats.invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if stats.invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_bytes(msg: Utf8Bytes, socket: &mut WebSocket, stats: &mut ConnStats) -> LoopControl {
    let bytes_len = msg.len();
    match socket.send(Message::Text(msg)).await.map_err(NetError::Ws) {
        Ok(()) => {
            stats.msgs_out += 1;
            stats.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send broadcast message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Only the connection that still owns the slot removes the player;
    // a replaced connection leaves it to its successor.
    let owned = ctx
        .lobby
        .unregister_player_connection_if_owner(player_id, ctx.player_conn_token)
        .await;
    if owned {
        ctx.input_tx
            .send(GameEvent::Leave { player_id })
            .await
            .map_err(|_| NetError::InputClosed)?;
    }

    debug!(
        player_id,
        msgs_in = ctx.stats.msgs_in,
        msgs_out = ctx.stats.msgs_out,
        bytes_in = ctx.stats.bytes_in,
        bytes_out = ctx.stats.bytes_out,
        invalid_json = ctx.stats.invalid_json,
        lag_recovery = ctx.stats.lag_recovery,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::protocol::{PointDto, SetMassDto};

    #[test]
    fn when_position_is_not_finite_then_message_is_dropped() {
        let msg = ClientMessage::Position(PointDto {
            x: f32::INFINITY,
            y: 0.0,
        });
        assert!(sanitize_message(1, msg).is_none());

        let msg = ClientMessage::SetMass(SetMassDto { mass: f32::NAN });
        assert!(sanitize_message(1, msg).is_none());
    }

    #[test]
    fn when_position_is_finite_then_it_is_forwarded_untouched() {
        // Client positions are trusted; no clamping happens here.
        let msg = ClientMessage::Position(PointDto {
            x: 1.0e6,
            y: -3.0,
        });
        match sanitize_message(4, msg) {
            Some(GameEvent::Position {
                player_id,
                position,
            }) => {
                assert_eq!(player_id, 4);
                assert_eq!(position, Vec2::new(1.0e6, -3.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn when_join_has_blank_name_and_nan_mass_then_defaults_are_used() {
        let payload = JoinPayload {
            display_name: "   ".to_string(),
            mass: Some(f32::NAN),
            position: Some(PointDto { x: 2.0, y: 3.0 }),
        };

        let join = normalize_join(payload, 10);

        assert_eq!(join.display_name, "anonymous");
        assert_eq!(join.mass, None);
        assert_eq!(join.position, Some(Vec2::new(2.0, 3.0)));
    }
}
