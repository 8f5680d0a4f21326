// Domain layer: core simulation types and rules.

pub mod errors;
pub mod events;
pub mod level;
pub mod path;
pub mod schedule;
pub mod session;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod zone;

pub use errors::CentroidError;
pub use events::SessionEvent;
pub use level::{LevelDefinition, ZoneDefinition, ZoneTemplate};
pub use session::{SessionContext, SessionSnapshot};
pub use state::{GameStats, Player, PlayerSnapshot, Sphere, SphereSnapshot, Visibility};
pub use zone::{Capabilities, EnemyStats, InteractionZone, MovementType, ZoneKind, ZoneShape, ZoneSnapshot};
