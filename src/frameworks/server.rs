// Framework bootstrap for the session server runtime.

use crate::domain::LevelDefinition;
use crate::domain::tuning::{PlayerTuning, SphereTuning};
use crate::frameworks::config;
use crate::interface_adapters::net::{
    create_lobby_handler, delete_lobby_handler, load_level_handler, spawn_lobby_serializers,
    ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyRegistry, LobbySettings};

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/lobbies", post(create_lobby_handler))
        .route("/lobbies/{lobby_id}", delete(delete_lobby_handler))
        .route("/lobbies/{lobby_id}/level", put(load_level_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let app = router(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let tick_interval = config::tick_interval();
    let lobby_registry = Arc::new(LobbyRegistry::new(LobbySettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        event_broadcast_capacity: config::EVENT_BROADCAST_CAPACITY,
        tick_interval,
        sphere_tuning: SphereTuning::default(),
        player_tuning: PlayerTuning::default(),
    }));
    tracing::debug!(tick_interval_ms = tick_interval.as_millis(), "lobby settings");

    // The default lobby is pinned so it never gets deleted.
    let default_lobby = lobby_registry
        .create_lobby(
            config::DEFAULT_LOBBY_ID.to_string(),
            LevelDefinition::default(),
            true,
        )
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default lobby: {e:?}")))?;
    spawn_lobby_serializers(&default_lobby);

    Ok(Arc::new(AppState {
        lobby_registry,
        default_lobby_id: Arc::from(config::DEFAULT_LOBBY_ID),
    }))
}
