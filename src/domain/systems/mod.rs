// Per-tick systems run by the session context.

pub mod centroid;
pub mod contacts;
pub mod dispatch;
pub mod zones;

pub use centroid::{CentroidEngine, CentroidTick, spawn_point};
pub use contacts::{Contact, ContactPhase, ContactTracker};
pub use dispatch::{World, ZoneOutcome};
