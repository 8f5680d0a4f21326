// Network adapter modules split by client sockets vs lobby management routes.

pub mod client;
pub mod internal;

pub use client::{spawn_lobby_serializers, ws_handler};
pub use internal::{create_lobby_handler, delete_lobby_handler, load_level_handler};
