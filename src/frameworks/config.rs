use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Fixed simulation step; zero or unparsable values fall back to 20 ms.
pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .unwrap_or(DEFAULT_TICK_INTERVAL_MS);
    Duration::from_millis(millis)
}

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const EVENT_BROADCAST_CAPACITY: usize = 256;

// Lobby that always exists and serves clients connecting without a lobby id.
pub const DEFAULT_LOBBY_ID: &str = "test";
